use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::InlineKeyboard,
    Result,
};

/// Outbound chat transport as seen by the core.
///
/// Every call may fail (network, deleted message, missing rights). Callers decide
/// whether a failure matters; most of them only log it.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send a new HTML message carrying an inline keyboard.
    async fn send_status(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: &InlineKeyboard,
    ) -> Result<MessageRef>;

    /// Replace text and keyboard of an existing message.
    async fn edit_status(&self, msg: MessageRef, html: &str, keyboard: &InlineKeyboard)
        -> Result<()>;

    /// Replace only the keyboard of an existing message.
    async fn edit_keyboard(&self, msg: MessageRef, keyboard: &InlineKeyboard) -> Result<()>;

    /// Pin a message without notifying members.
    async fn pin(&self, msg: MessageRef) -> Result<()>;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
}
