use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    audit::{AuditAction, AuditLog, AuditRecord},
    domain::{ChatId, Holder, MessageRef, UserId},
    roster::Roster,
    state::{KeyState, StateStore},
    Result,
};

/// Outcome of an accepted transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub previous: Holder,
    pub current: Holder,
}

impl Transition {
    /// The key stayed with the same person.
    pub fn is_reaffirmation(&self) -> bool {
        self.previous == self.current
    }
}

/// Sole writer of the `KeyState`.
///
/// Each accepted operation persists the new state first and then appends one audit
/// row. A failed save leaves the in-memory state untouched; a failed append is only
/// logged.
pub struct TransferEngine {
    roster: Roster,
    store: StateStore,
    audit: AuditLog,
    state: KeyState,
}

impl TransferEngine {
    /// Load persisted state and prepare the audit log.
    pub fn open(roster: Roster, store: StateStore, audit: AuditLog) -> Self {
        let state = store.load(&roster);
        if let Err(e) = audit.ensure_initialized() {
            warn!(path = %audit.path().display(), error = %e, "failed to initialize audit log");
        }
        Self::with_state(roster, store, audit, state)
    }

    pub fn with_state(
        roster: Roster,
        store: StateStore,
        audit: AuditLog,
        state: KeyState,
    ) -> Self {
        Self {
            roster,
            store,
            audit,
            state,
        }
    }

    pub fn state(&self) -> &KeyState {
        &self.state
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn transfer(&mut self, target: &str, actor: UserId, chat: ChatId) -> Result<Transition> {
        self.transfer_at(target, actor, chat, Utc::now())
    }

    pub fn transfer_at(
        &mut self,
        target: &str,
        actor: UserId,
        chat: ChatId,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let to = self.roster.resolve(target)?;
        self.apply(AuditAction::Transfer, to, actor, chat, now)
    }

    /// Hand the key back to the default holder. Returns who had it.
    pub fn reset(&mut self, actor: UserId, chat: ChatId) -> Result<Holder> {
        self.reset_at(actor, chat, Utc::now())
    }

    pub fn reset_at(&mut self, actor: UserId, chat: ChatId, now: DateTime<Utc>) -> Result<Holder> {
        let to = self.roster.default_holder();
        let t = self.apply(AuditAction::Reset, to, actor, chat, now)?;
        Ok(t.previous)
    }

    /// Remember which message now shows the pinned status.
    pub fn adopt_display_ref(&mut self, display_ref: MessageRef) -> Result<()> {
        if self.state.display_ref == Some(display_ref) {
            return Ok(());
        }
        let mut next = self.state.clone();
        next.display_ref = Some(display_ref);
        self.store.save(&next)?;
        self.state = next;
        Ok(())
    }

    fn apply(
        &mut self,
        action: AuditAction,
        to: Holder,
        actor: UserId,
        chat: ChatId,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let previous = self.state.current_holder.clone();

        let mut next = self.state.clone();
        next.current_holder = to.clone();
        // Never move backwards, even if the wall clock does.
        next.updated_at = now.max(self.state.updated_at);

        self.store.save(&next)?;
        self.state = next;

        let record = AuditRecord {
            timestamp_utc: self.state.updated_at,
            action,
            from_holder: previous.clone(),
            to_holder: to.clone(),
            actor_id: actor,
            chat_id: chat,
        };
        if let Err(e) = self.audit.append(&record) {
            warn!(
                path = %self.audit.path().display(),
                error = %e,
                action = action.as_str(),
                "failed to append audit record"
            );
        }

        info!(
            action = action.as_str(),
            from = %previous,
            to = %to,
            actor = actor.0,
            chat = chat.0,
            "key holder updated"
        );

        Ok(Transition {
            previous,
            current: to,
        })
    }
}
