//! Telegram adapter (teloxide).
//!
//! This crate implements the `kb-core` MessagingPort over the Telegram Bot API and
//! routes updates into `KeyService`.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
    ApiError, RequestError,
};

pub mod handlers;
pub mod router;

use kb_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::InlineKeyboard},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    fn markup(keyboard: &InlineKeyboard) -> InlineKeyboardMarkup {
        let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| {
                        InlineKeyboardButton::callback(b.label.clone(), b.callback_data.clone())
                    })
                    .collect()
            })
            .collect();
        InlineKeyboardMarkup::new(rows)
    }
}

/// Telegram rejects edits that would not change anything; for us that is success.
fn not_modified_is_ok<T>(res: std::result::Result<T, RequestError>) -> Result<()> {
    match res {
        Ok(_) => Ok(()),
        Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(TelegramMessenger::map_err(e)),
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_status(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: &InlineKeyboard,
    ) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), html.to_string())
            .parse_mode(ParseMode::Html)
            .reply_markup(Self::markup(keyboard))
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn edit_status(
        &self,
        msg: MessageRef,
        html: &str,
        keyboard: &InlineKeyboard,
    ) -> Result<()> {
        let res = self
            .bot
            .edit_message_text(
                Self::tg_chat(msg.chat_id),
                Self::tg_msg_id(msg.message_id),
                html.to_string(),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(Self::markup(keyboard))
            .await;
        not_modified_is_ok(res)
    }

    async fn edit_keyboard(&self, msg: MessageRef, keyboard: &InlineKeyboard) -> Result<()> {
        let res = self
            .bot
            .edit_message_reply_markup(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
            .reply_markup(Self::markup(keyboard))
            .await;
        not_modified_is_ok(res)
    }

    async fn pin(&self, msg: MessageRef) -> Result<()> {
        self.bot
            .pin_chat_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
            .disable_notification(true)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), html.to_string())
            .parse_mode(ParseMode::Html)
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}
