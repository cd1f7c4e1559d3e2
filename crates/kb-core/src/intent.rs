//! What a chat update asks the bot to do.

const CB_TRANSFER_OPEN: &str = "transferir";
const CB_TRANSFER_CANCEL: &str = "voltar";
const CB_TRANSFER_SELECT: &str = "definir::";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Start,
    Help,
    Setup,
    Status,
    Reset,
    TransferOpen,
    TransferSelect(String),
    TransferCancel,
}

impl Intent {
    /// Parse a `/command` message. Unknown commands yield `None`.
    pub fn from_command(text: &str) -> Option<Self> {
        let (cmd, _args) = parse_command(text);
        match cmd.as_str() {
            "start" => Some(Intent::Start),
            "help" => Some(Intent::Help),
            "setup" => Some(Intent::Setup),
            "status" => Some(Intent::Status),
            "reset" => Some(Intent::Reset),
            _ => None,
        }
    }

    /// Parse inline button callback data.
    pub fn from_callback(data: &str) -> Option<Self> {
        if data == CB_TRANSFER_OPEN {
            return Some(Intent::TransferOpen);
        }
        if data == CB_TRANSFER_CANCEL {
            return Some(Intent::TransferCancel);
        }
        let name = data.strip_prefix(CB_TRANSFER_SELECT)?;
        if name.is_empty() {
            return None;
        }
        Some(Intent::TransferSelect(name.to_string()))
    }

    /// Callback payload for intents that can sit behind a button.
    pub fn callback_data(&self) -> Option<String> {
        match self {
            Intent::TransferOpen => Some(CB_TRANSFER_OPEN.to_string()),
            Intent::TransferCancel => Some(CB_TRANSFER_CANCEL.to_string()),
            Intent::TransferSelect(name) => Some(format!("{CB_TRANSFER_SELECT}{name}")),
            _ => None,
        }
    }
}

/// Split `/cmd@botname args` into a lowercase command and the rest.
pub fn parse_command(text: &str) -> (String, String) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// Bytes left for a holder name inside Telegram's 64-byte callback payload.
pub const MAX_CALLBACK_NAME_BYTES: usize = 64 - CB_TRANSFER_SELECT.len();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_bot_suffix() {
        assert_eq!(Intent::from_command("/setup@chave_bot"), Some(Intent::Setup));
        assert_eq!(Intent::from_command("/STATUS now"), Some(Intent::Status));
        assert_eq!(Intent::from_command("/reset"), Some(Intent::Reset));
        assert_eq!(Intent::from_command("/nope"), None);
        assert_eq!(
            parse_command("/start@x  hello there"),
            ("start".to_string(), "hello there".to_string())
        );
    }

    #[test]
    fn parses_callbacks() {
        assert_eq!(Intent::from_callback("transferir"), Some(Intent::TransferOpen));
        assert_eq!(Intent::from_callback("voltar"), Some(Intent::TransferCancel));
        assert_eq!(
            Intent::from_callback("definir::Maria Cecília"),
            Some(Intent::TransferSelect("Maria Cecília".to_string()))
        );
        // Names may themselves contain the separator.
        assert_eq!(
            Intent::from_callback("definir::a::b"),
            Some(Intent::TransferSelect("a::b".to_string()))
        );
        assert_eq!(Intent::from_callback("definir::"), None);
        assert_eq!(Intent::from_callback("askuser:1:2"), None);
    }

    #[test]
    fn callback_data_round_trips() {
        for intent in [
            Intent::TransferOpen,
            Intent::TransferCancel,
            Intent::TransferSelect("Bob".to_string()),
        ] {
            let data = intent.callback_data().unwrap();
            assert_eq!(Intent::from_callback(&data), Some(intent));
        }
        assert_eq!(Intent::Status.callback_data(), None);
    }
}
