use std::path::PathBuf;

/// Core error type for the key holder bot.
///
/// Only `InvalidHolder` and `Persistence` are meant to reach the person who
/// triggered an operation; transport and audit failures are logged and absorbed
/// by the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid holder: {0}")]
    InvalidHolder(String),

    #[error("failed to persist {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Whether the error should be shown to the actor that caused it.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::InvalidHolder(_) | Error::Persistence { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
