use crate::{domain::Holder, intent::Intent, roster::Roster};

pub const TRANSFER_LABEL: &str = "Transferir";
pub const BACK_LABEL: &str = "⬅️ Voltar";

/// Picker buttons per row.
const PICKER_COLUMNS: usize = 3;

/// Inline keyboard (rows of callback buttons).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    fn for_intent(label: impl Into<String>, intent: &Intent) -> Self {
        Self {
            label: label.into(),
            callback_data: intent.callback_data().unwrap_or_default(),
        }
    }
}

impl InlineKeyboard {
    pub fn new(rows: Vec<Vec<InlineButton>>) -> Self {
        Self { rows }
    }

    /// Keyboard attached to every status message.
    pub fn main() -> Self {
        Self::new(vec![vec![InlineButton::for_intent(
            TRANSFER_LABEL,
            &Intent::TransferOpen,
        )]])
    }

    /// Roster picker. The current holder is left out unless the key is at the default.
    pub fn picker(roster: &Roster, current: &Holder) -> Self {
        let exclude = (!roster.is_default(current)).then(|| current.as_str());

        let buttons: Vec<InlineButton> = roster
            .names()
            .filter(|name| Some(*name) != exclude)
            .map(|name| {
                InlineButton::for_intent(name, &Intent::TransferSelect(name.to_string()))
            })
            .collect();

        let mut rows: Vec<Vec<InlineButton>> = buttons
            .chunks(PICKER_COLUMNS)
            .map(|c| c.to_vec())
            .collect();
        rows.push(vec![InlineButton::for_intent(
            BACK_LABEL,
            &Intent::TransferCancel,
        )]);
        Self::new(rows)
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }
}
