use std::fmt;

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Chat an intent was issued from.
///
/// Only group chats may become the home of the pinned status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Origin {
    pub chat_id: ChatId,
    pub is_group: bool,
}

impl Origin {
    pub fn group(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            is_group: true,
        }
    }

    pub fn private(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            is_group: false,
        }
    }
}

/// Name of whoever currently has the key. Only a `Roster` hands these out.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Holder(pub(crate) String);

impl Holder {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Holder {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Holder {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
