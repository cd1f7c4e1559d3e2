//! Telegram update handlers.
//!
//! Each handler turns an update into an `Intent`, calls into `KeyService` and
//! answers the chat. Transport hiccups are logged and never surfaced as errors to
//! the dispatcher.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Chat, Message},
};

use kb_core::{
    domain::{ChatId, Origin, UserId},
    intent::Intent,
};

use crate::router::AppState;

mod callback;
mod commands;

/// Only groups and supergroups can host the pinned status.
fn origin_of(chat: &Chat) -> Origin {
    let chat_id = ChatId(chat.id.0);
    if chat.is_group() || chat.is_supergroup() {
        Origin::group(chat_id)
    } else {
        Origin::private(chat_id)
    }
}

/// Anonymous admins and channel posts carry no user.
fn sender_id(msg: &Message) -> Option<UserId> {
    msg.from().map(|u| UserId(u.id.0 as i64))
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if !text.starts_with('/') {
        return Ok(());
    }

    match Intent::from_command(text) {
        Some(intent) => commands::handle_command(bot, msg, intent, state).await,
        // Group chats see commands meant for other bots; stay quiet.
        None => Ok(()),
    }
}
