use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    display::{DisplaySync, Reconciled},
    domain::{ChatId, Holder, MessageRef, Origin, UserId},
    engine::{TransferEngine, Transition},
    messaging::types::InlineKeyboard,
    roster::Roster,
    state::KeyState,
    Result,
};

/// Result of a transfer/reset as reported back to the chat layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferReport {
    pub transition: Transition,
    pub display: Reconciled,
}

/// Application context around the single `TransferEngine`.
///
/// One async mutex covers state mutation, persistence, the audit append and the
/// display sync, so concurrent intents are applied strictly one after another.
pub struct KeyService {
    engine: Mutex<TransferEngine>,
    roster: Roster,
    display: DisplaySync,
}

impl KeyService {
    pub fn new(engine: TransferEngine, display: DisplaySync) -> Self {
        let roster = engine.roster().clone();
        Self {
            engine: Mutex::new(engine),
            roster,
            display,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub async fn snapshot(&self) -> KeyState {
        self.engine.lock().await.state().clone()
    }

    /// Create or refresh the pinned status in `chat` and remember it.
    pub async fn setup(&self, chat: ChatId) -> Reconciled {
        let mut engine = self.engine.lock().await;
        let state = engine.state().clone();
        let outcome = self.display.reconcile(&state, &self.roster, chat).await;
        adopt(&mut engine, outcome);
        outcome
    }

    /// Post a one-off status message (not pinned, not tracked).
    pub async fn status(&self, chat: ChatId) -> Result<MessageRef> {
        let state = self.snapshot().await;
        self.display.post(chat, &state, &self.roster).await
    }

    pub async fn transfer(
        &self,
        target: &str,
        actor: UserId,
        origin: Origin,
    ) -> Result<TransferReport> {
        let mut engine = self.engine.lock().await;
        let transition = engine.transfer(target, actor, origin.chat_id)?;
        let display = self.sync_locked(&mut engine, origin).await;
        Ok(TransferReport {
            transition,
            display,
        })
    }

    pub async fn reset(&self, actor: UserId, origin: Origin) -> Result<TransferReport> {
        let mut engine = self.engine.lock().await;
        let previous: Holder = engine.reset(actor, origin.chat_id)?;
        let display = self.sync_locked(&mut engine, origin).await;
        Ok(TransferReport {
            transition: Transition {
                previous,
                current: self.roster.default_holder(),
            },
            display,
        })
    }

    /// Swap the keyboard of `msg` for the roster picker.
    pub async fn open_picker(&self, msg: MessageRef) -> Result<()> {
        let current = self.snapshot().await.current_holder;
        let picker = InlineKeyboard::picker(&self.roster, &current);
        self.display.set_keyboard(msg, &picker).await
    }

    /// Put the main keyboard back on `msg`.
    pub async fn close_picker(&self, msg: MessageRef) -> Result<()> {
        self.display.set_keyboard(msg, &InlineKeyboard::main()).await
    }

    /// Show the current status inside `msg` (e.g. the message whose button was pressed).
    pub async fn show_in(&self, msg: MessageRef) -> Result<()> {
        let state = self.snapshot().await;
        self.display.show_in(msg, &state, &self.roster).await
    }

    pub async fn notify(&self, chat: ChatId, html: &str) -> Result<MessageRef> {
        self.display.notify(chat, html).await
    }

    async fn sync_locked(&self, engine: &mut TransferEngine, origin: Origin) -> Reconciled {
        let state = engine.state().clone();
        let outcome = self.display.refresh(&state, &self.roster, origin).await;
        adopt(engine, outcome);
        outcome
    }
}

fn adopt(engine: &mut TransferEngine, outcome: Reconciled) {
    let Reconciled::Recreated { msg, .. } = outcome else {
        return;
    };
    // The holder change is already durable; losing the display ref only costs a
    // fresh status message next time.
    if let Err(e) = engine.adopt_display_ref(msg) {
        warn!(chat = msg.chat_id.0, message_id = msg.message_id.0, error = %e, "failed to persist display ref");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audit::AuditLog,
        display::tests::{set, Call, FakeMessenger},
        domain::MessageId,
        errors::Error,
        state::StateStore,
    };
    use chrono::FixedOffset;
    use std::{sync::Arc, time::Duration};

    struct Fixture {
        dir: tempfile::TempDir,
        fake: Arc<FakeMessenger>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                fake: Arc::new(FakeMessenger::default()),
            }
        }

        fn service(&self) -> KeyService {
            let roster = Roster::new(["Secretariat", "Alice", "Bob"], "Secretariat").unwrap();
            let engine = TransferEngine::open(
                roster,
                StateStore::new(self.dir.path().join("state.json")),
                AuditLog::new(self.dir.path().join("log.csv")),
            );
            let display = DisplaySync::new(
                self.fake.clone(),
                Duration::from_secs(2),
                FixedOffset::west_opt(3 * 3600).unwrap(),
            );
            KeyService::new(engine, display)
        }

        fn log_lines(&self) -> Vec<String> {
            std::fs::read_to_string(self.dir.path().join("log.csv"))
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[tokio::test]
    async fn setup_pins_and_remembers_message() {
        let fx = Fixture::new();
        let svc = fx.service();

        let first = svc.setup(ChatId(100)).await;
        let Reconciled::Recreated { msg, pinned: true } = first else {
            panic!("unexpected {first:?}");
        };
        assert_eq!(svc.snapshot().await.display_ref, Some(msg));

        // Second setup edits the same message instead of posting again.
        assert_eq!(svc.setup(ChatId(100)).await, Reconciled::Updated(msg));

        // And the ref survives a restart.
        drop(svc);
        assert_eq!(fx.service().snapshot().await.display_ref, Some(msg));
    }

    #[tokio::test]
    async fn transfer_updates_pinned_status() {
        let fx = Fixture::new();
        let svc = fx.service();
        let pinned = svc.setup(ChatId(100)).await.message().unwrap();

        let report = svc.transfer("Bob", UserId(1), Origin::group(ChatId(100))).await.unwrap();
        assert_eq!(report.transition.previous, "Secretariat");
        assert_eq!(report.transition.current, "Bob");
        assert_eq!(report.display, Reconciled::Updated(pinned));

        let last = fx.fake.calls().last().cloned().unwrap();
        assert!(matches!(last, Call::Edit(m, ref html) if m == pinned && html.contains("Bob")));
    }

    #[tokio::test]
    async fn deleted_pinned_message_is_replaced() {
        let fx = Fixture::new();
        let svc = fx.service();
        let old = svc.setup(ChatId(100)).await.message().unwrap();

        set(&fx.fake.fail_edit, true);
        let report = svc.reset(UserId(3), Origin::group(ChatId(100))).await.unwrap();
        let Reconciled::Recreated { msg, .. } = report.display else {
            panic!("unexpected {:?}", report.display);
        };
        assert_ne!(msg, old);
        assert_eq!(svc.snapshot().await.display_ref, Some(msg));
    }

    #[tokio::test]
    async fn transport_outage_does_not_roll_back() {
        let fx = Fixture::new();
        let svc = fx.service();
        set(&fx.fake.fail_send, true);
        set(&fx.fake.fail_edit, true);

        let report = svc.transfer("Alice", UserId(1), Origin::group(ChatId(100))).await.unwrap();
        assert_eq!(report.display, Reconciled::Unavailable);
        let st = svc.snapshot().await;
        assert_eq!(st.current_holder, "Alice");
        assert_eq!(st.display_ref, None);
        assert_eq!(fx.log_lines().len(), 2);
    }

    #[tokio::test]
    async fn invalid_holder_is_rejected_without_side_effects() {
        let fx = Fixture::new();
        let svc = fx.service();
        let err = svc
            .transfer("Carol", UserId(1), Origin::group(ChatId(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHolder(_)));
        assert!(fx.fake.calls().is_empty());
        assert_eq!(fx.log_lines().len(), 1);
        assert_eq!(svc.snapshot().await.current_holder, "Secretariat");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transfers_are_serialized() {
        let fx = Fixture::new();
        let svc = Arc::new(fx.service());

        let mut tasks = Vec::new();
        for i in 0..20i64 {
            let svc = svc.clone();
            let target = if i % 2 == 0 { "Alice" } else { "Bob" };
            tasks.push(tokio::spawn(async move {
                svc.transfer(target, UserId(i), Origin::group(ChatId(100))).await.unwrap()
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        // Each row's "from" must be the previous row's "to".
        let rows: Vec<Vec<String>> = fx
            .log_lines()
            .iter()
            .skip(1)
            .map(|l| l.split(',').map(str::to_string).collect())
            .collect();
        assert_eq!(rows.len(), 20);
        assert_eq!(rows[0][2], "Secretariat");
        for pair in rows.windows(2) {
            assert_eq!(pair[1][2], pair[0][3]);
        }

        // Only the first sync had to create a message.
        let sends = fx
            .fake
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Send(..)))
            .count();
        assert_eq!(sends, 1);
    }

    #[tokio::test]
    async fn private_chat_transfer_keeps_group_status() {
        let fx = Fixture::new();
        let svc = fx.service();
        let group = ChatId(-100);
        let group_pin = svc.setup(group).await.message().unwrap();

        let report = svc
            .transfer("Bob", UserId(1), Origin::private(ChatId(42)))
            .await
            .unwrap();
        assert_eq!(report.display, Reconciled::Updated(group_pin));
        assert_eq!(svc.snapshot().await.display_ref, Some(group_pin));
        assert!(!fx
            .fake
            .calls()
            .iter()
            .any(|c| matches!(c, Call::Send(chat, _) if *chat == ChatId(42))));

        // The next group action edits the same pinned message.
        let report = svc.reset(UserId(2), Origin::group(group)).await.unwrap();
        assert_eq!(report.display, Reconciled::Updated(group_pin));
        let pins = fx
            .fake
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Pin(_)))
            .count();
        assert_eq!(pins, 1);
    }

    #[tokio::test]
    async fn private_chat_cannot_recreate_group_status() {
        let fx = Fixture::new();
        let svc = fx.service();
        let group_pin = svc.setup(ChatId(-100)).await.message().unwrap();

        set(&fx.fake.fail_edit, true);
        let report = svc
            .reset(UserId(2), Origin::private(ChatId(42)))
            .await
            .unwrap();
        assert_eq!(report.display, Reconciled::Unavailable);
        assert_eq!(svc.snapshot().await.display_ref, Some(group_pin));
        assert_eq!(svc.snapshot().await.current_holder, "Secretariat");
        assert_eq!(fx.log_lines().len(), 2);
    }

    #[tokio::test]
    async fn picker_round_trip_only_touches_keyboard() {
        let fx = Fixture::new();
        let svc = fx.service();
        svc.transfer("Alice", UserId(1), Origin::group(ChatId(100))).await.unwrap();
        let msg = MessageRef {
            chat_id: ChatId(100),
            message_id: MessageId(900),
        };

        svc.open_picker(msg).await.unwrap();
        svc.close_picker(msg).await.unwrap();

        let calls = fx.fake.calls();
        let kbs: Vec<&InlineKeyboard> = calls
            .iter()
            .filter_map(|c| match c {
                Call::EditKeyboard(m, kb) if *m == msg => Some(kb),
                _ => None,
            })
            .collect();
        assert_eq!(kbs.len(), 2);
        assert!(!kbs[0].buttons().any(|b| b.label == "Alice"));
        assert_eq!(kbs[1], &InlineKeyboard::main());
    }
}
