use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    domain::{ChatId, Holder, MessageId, MessageRef},
    errors::Error,
    roster::Roster,
    Result,
};

/// Who has the key right now, since when, and where the pinned status lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyState {
    pub current_holder: Holder,
    pub updated_at: DateTime<Utc>,
    pub display_ref: Option<MessageRef>,
}

impl KeyState {
    pub fn initial(roster: &Roster, now: DateTime<Utc>) -> Self {
        Self {
            current_holder: roster.default_holder(),
            updated_at: now,
            display_ref: None,
        }
    }
}

/// On-disk shape of the state file. Field names are shared with older deployments.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct StateFileData {
    current_holder: String,
    updated_at_iso: String,
    #[serde(default)]
    pinned_message_id: Option<i32>,
    #[serde(default)]
    chat_id: Option<i64>,
}

impl From<&KeyState> for StateFileData {
    fn from(s: &KeyState) -> Self {
        Self {
            current_holder: s.current_holder.as_str().to_string(),
            updated_at_iso: s.updated_at.to_rfc3339(),
            pinned_message_id: s.display_ref.map(|r| r.message_id.0),
            chat_id: s.display_ref.map(|r| r.chat_id.0),
        }
    }
}

/// JSON file backing the single `KeyState`.
#[derive(Clone, Debug)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, degrading to the initial state on any problem.
    pub fn load(&self, roster: &Roster) -> KeyState {
        self.load_at(roster, Utc::now())
    }

    pub fn load_at(&self, roster: &Roster, now: DateTime<Utc>) -> KeyState {
        match self.read(roster) {
            Ok(Some(state)) => state,
            Ok(None) => {
                debug!(path = %self.path.display(), "no state file yet; starting from default holder");
                KeyState::initial(roster, now)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable state file; starting from default holder");
                KeyState::initial(roster, now)
            }
        }
    }

    fn read(&self, roster: &Roster) -> Result<Option<KeyState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let txt = fs::read_to_string(&self.path)?;
        if txt.trim().is_empty() {
            return Ok(None);
        }
        let data: StateFileData = serde_json::from_str(&txt)?;

        let updated_at = DateTime::parse_from_rfc3339(data.updated_at_iso.trim())
            .map_err(|e| Error::Persistence {
                path: self.path.clone(),
                reason: format!("bad updated_at_iso: {e}"),
            })?
            .with_timezone(&Utc);

        // Roster may have changed between deployments.
        let current_holder = match roster.resolve(&data.current_holder) {
            Ok(h) => h,
            Err(_) => {
                warn!(holder = %data.current_holder, "persisted holder is no longer in the roster; using default");
                roster.default_holder()
            }
        };

        let display_ref = match (data.pinned_message_id, data.chat_id) {
            (Some(message_id), Some(chat_id)) => Some(MessageRef {
                chat_id: ChatId(chat_id),
                message_id: MessageId(message_id),
            }),
            _ => None,
        };

        Ok(Some(KeyState {
            current_holder,
            updated_at,
            display_ref,
        }))
    }

    /// Write the full state atomically: temp file, fsync, rename.
    pub fn save(&self, state: &KeyState) -> Result<()> {
        self.write_atomic(state).map_err(|e| Error::Persistence {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn write_atomic(&self, state: &KeyState) -> Result<()> {
        let txt = serde_json::to_string_pretty(&StateFileData::from(state))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(txt.as_bytes())?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}
