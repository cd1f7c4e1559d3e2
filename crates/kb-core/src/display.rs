//! Status rendering and pinned-message reconciliation.

use std::{future::Future, sync::Arc, time::Duration};

use chrono::FixedOffset;
use tracing::{debug, warn};

use crate::{
    domain::{ChatId, MessageRef, Origin},
    errors::Error,
    formatting::{escape_html, format_local_timestamp},
    messaging::{port::MessagingPort, types::InlineKeyboard},
    roster::Roster,
    state::KeyState,
    Result,
};

pub const STATUS_TITLE: &str = "🔑 Status da Chave";
const AWAY_FROM_DEFAULT: &str = "Fora da";

/// What happened to the pinned status during a sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciled {
    /// The known message was edited in place.
    Updated(MessageRef),
    /// A new message was sent; the caller must adopt it as the display ref.
    Recreated { msg: MessageRef, pinned: bool },
    /// Nothing could be shown.
    Unavailable,
}

impl Reconciled {
    pub fn message(&self) -> Option<MessageRef> {
        match self {
            Reconciled::Updated(m) => Some(*m),
            Reconciled::Recreated { msg, .. } => Some(*msg),
            Reconciled::Unavailable => None,
        }
    }
}

/// Pushes `KeyState` to the chat transport.
///
/// Every transport call is bounded by `call_timeout`; failures are logged and turned
/// into a fallback, never propagated back into the state machine.
#[derive(Clone)]
pub struct DisplaySync {
    messenger: Arc<dyn MessagingPort>,
    call_timeout: Duration,
    offset: FixedOffset,
}

impl DisplaySync {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        call_timeout: Duration,
        offset: FixedOffset,
    ) -> Self {
        Self {
            messenger,
            call_timeout,
            offset,
        }
    }

    /// Status payload (Telegram HTML). Deterministic for a given state.
    pub fn render(&self, state: &KeyState, roster: &Roster) -> String {
        let holder = escape_html(state.current_holder.as_str());
        let updated = format_local_timestamp(state.updated_at, self.offset);
        let default = escape_html(roster.default_holder().as_str());
        let place = if roster.is_default(&state.current_holder) {
            default
        } else {
            format!("{AWAY_FROM_DEFAULT} {default}")
        };

        format!(
            "{STATUS_TITLE}\n\n<b>Chave com:</b> {holder}\n<b>Atualizado:</b> {updated}\n<b>Local:</b> {place}"
        )
    }

    /// Make `chat` the home of the pinned status (`/setup`).
    ///
    /// Edits the known message when it belongs to `chat`; otherwise, or when the edit
    /// fails, sends a fresh one there and tries to pin it.
    pub async fn reconcile(&self, state: &KeyState, roster: &Roster, chat: ChatId) -> Reconciled {
        let html = self.render(state, roster);
        let keyboard = InlineKeyboard::main();

        if let Some(known) = state.display_ref.filter(|r| r.chat_id == chat) {
            if self.edit_known(known, &html, &keyboard).await {
                return Reconciled::Updated(known);
            }
        }
        self.recreate(chat, &html, &keyboard).await
    }

    /// Bring the pinned status up to date after a holder change issued from `origin`.
    ///
    /// The known message is edited wherever it lives. A replacement is only posted in
    /// the chat that already hosts the status, or in a group when none is known yet,
    /// so a private chat never takes the status away from the group.
    pub async fn refresh(&self, state: &KeyState, roster: &Roster, origin: Origin) -> Reconciled {
        let html = self.render(state, roster);
        let keyboard = InlineKeyboard::main();

        let home = match state.display_ref {
            Some(known) => {
                if self.edit_known(known, &html, &keyboard).await {
                    return Reconciled::Updated(known);
                }
                if known.chat_id != origin.chat_id {
                    debug!(
                        chat = known.chat_id.0,
                        origin = origin.chat_id.0,
                        "pinned status lives in another chat; not recreating"
                    );
                    return Reconciled::Unavailable;
                }
                known.chat_id
            }
            None if origin.is_group => origin.chat_id,
            None => return Reconciled::Unavailable,
        };
        self.recreate(home, &html, &keyboard).await
    }

    async fn edit_known(&self, known: MessageRef, html: &str, keyboard: &InlineKeyboard) -> bool {
        match self
            .bounded("edit_status", self.messenger.edit_status(known, html, keyboard))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(chat = known.chat_id.0, message_id = known.message_id.0, error = %e, "pinned status edit failed");
                false
            }
        }
    }

    async fn recreate(&self, chat: ChatId, html: &str, keyboard: &InlineKeyboard) -> Reconciled {
        let msg = match self
            .bounded("send_status", self.messenger.send_status(chat, html, keyboard))
            .await
        {
            Ok(m) => m,
            Err(e) => {
                warn!(chat = chat.0, error = %e, "could not send status message");
                return Reconciled::Unavailable;
            }
        };

        let pinned = match self.bounded("pin", self.messenger.pin(msg)).await {
            Ok(()) => true,
            Err(e) => {
                debug!(chat = chat.0, message_id = msg.message_id.0, error = %e, "pin failed");
                false
            }
        };

        Reconciled::Recreated { msg, pinned }
    }

    /// Replace the content of an arbitrary message with the status view.
    pub async fn show_in(&self, msg: MessageRef, state: &KeyState, roster: &Roster) -> Result<()> {
        let html = self.render(state, roster);
        self.bounded("edit_status", self.messenger.edit_status(msg, &html, &InlineKeyboard::main()))
            .await
    }

    /// Post the status as a plain (unpinned, untracked) message.
    pub async fn post(
        &self,
        chat: ChatId,
        state: &KeyState,
        roster: &Roster,
    ) -> Result<MessageRef> {
        let html = self.render(state, roster);
        let keyboard = InlineKeyboard::main();
        self.bounded("send_status", self.messenger.send_status(chat, &html, &keyboard))
            .await
    }

    pub async fn set_keyboard(&self, msg: MessageRef, keyboard: &InlineKeyboard) -> Result<()> {
        self.bounded("edit_keyboard", self.messenger.edit_keyboard(msg, keyboard))
            .await
    }

    pub async fn notify(&self, chat: ChatId, html: &str) -> Result<MessageRef> {
        self.bounded("send_html", self.messenger.send_html(chat, html))
            .await
    }

    async fn bounded<T>(&self, op: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(Error::Transport(format!(
                "{op} timed out after {}ms",
                self.call_timeout.as_millis()
            ))),
        }
    }
}
