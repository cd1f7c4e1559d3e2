//! Chat transport abstractions (Telegram today).

pub mod port;
pub mod types;
