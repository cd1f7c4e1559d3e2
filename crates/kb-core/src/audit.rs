use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};

use crate::{
    domain::{ChatId, Holder, UserId},
    Result,
};

/// Column header of the audit CSV. Kept byte-compatible with existing log files.
pub const AUDIT_HEADER: [&str; 6] = [
    "timestamp_utc",
    "acao",
    "de",
    "para",
    "by_user_id",
    "chat_id",
];

const LINE_END: &str = "\r\n";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditAction {
    Transfer,
    Reset,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Transfer => "transfer",
            AuditAction::Reset => "reset",
        }
    }
}

/// One accepted transfer or reset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditRecord {
    pub timestamp_utc: DateTime<Utc>,
    pub action: AuditAction,
    pub from_holder: Holder,
    pub to_holder: Holder,
    pub actor_id: UserId,
    pub chat_id: ChatId,
}

impl AuditRecord {
    fn to_row(&self) -> String {
        let fields = [
            self.timestamp_utc.to_rfc3339(),
            self.action.as_str().to_string(),
            self.from_holder.as_str().to_string(),
            self.to_holder.as_str().to_string(),
            self.actor_id.0.to_string(),
            self.chat_id.0.to_string(),
        ];
        csv_row(fields.iter().map(String::as_str))
    }
}

/// Append-only CSV log of key movements.
#[derive(Clone, Debug)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with its header when it is missing or empty.
    pub fn ensure_initialized(&self) -> Result<()> {
        let needs_header = match fs::metadata(&self.path) {
            Ok(md) => md.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };
        if !needs_header {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(csv_row(AUDIT_HEADER).as_bytes())?;
        Ok(())
    }

    pub fn append(&self, record: &AuditRecord) -> Result<()> {
        self.ensure_initialized()?;

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(record.to_row().as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

fn csv_row<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = fields
        .into_iter()
        .map(csv_field)
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(LINE_END);
    out
}

/// Minimal quoting: only fields containing a delimiter, quote or line break.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::Roster;
    use chrono::TimeZone;

    fn record(action: AuditAction, from: &str, to: &str) -> AuditRecord {
        let roster = Roster::new(["Secretariat", "Alice", "Bob", "O'Neil, Jr."], "Secretariat")
            .unwrap();
        AuditRecord {
            timestamp_utc: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
            action,
            from_holder: roster.resolve(from).unwrap(),
            to_holder: roster.resolve(to).unwrap(),
            actor_id: UserId(7),
            chat_id: ChatId(-100),
        }
    }

    #[test]
    fn ensure_initialized_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("log.csv"));
        log.ensure_initialized().unwrap();
        log.ensure_initialized().unwrap();
        let txt = fs::read_to_string(log.path()).unwrap();
        assert_eq!(txt, "timestamp_utc,acao,de,para,by_user_id,chat_id\r\n");
    }

    #[test]
    fn appends_rows_after_header_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("log.csv"));
        log.append(&record(AuditAction::Transfer, "Secretariat", "Bob"))
            .unwrap();
        log.append(&record(AuditAction::Reset, "Bob", "Secretariat"))
            .unwrap();

        let txt = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(
            lines,
            vec![
                "timestamp_utc,acao,de,para,by_user_id,chat_id",
                "2026-01-02T03:04:05+00:00,transfer,Secretariat,Bob,7,-100",
                "2026-01-02T03:04:05+00:00,reset,Bob,Secretariat,7,-100",
            ]
        );
    }

    #[test]
    fn existing_rows_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let legacy = "timestamp_utc,acao,de,para,by_user_id,chat_id\r\n\
                      2025-01-01T00:00:00+00:00,transferir,Secretaria,Lucas,1,2\r\n";
        fs::write(&path, legacy).unwrap();

        let log = AuditLog::new(&path);
        log.append(&record(AuditAction::Transfer, "Alice", "Bob"))
            .unwrap();

        let txt = fs::read_to_string(&path).unwrap();
        assert!(txt.starts_with(legacy));
        assert_eq!(txt.lines().count(), 3);
    }

    #[test]
    fn quotes_names_with_delimiters() {
        let row = record(AuditAction::Transfer, "Alice", "O'Neil, Jr.").to_row();
        assert_eq!(
            row,
            "2026-01-02T03:04:05+00:00,transfer,Alice,\"O'Neil, Jr.\",7,-100\r\n"
        );
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn append_to_unwritable_location_errors() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("missing").join("log.csv"));
        assert!(log
            .append(&record(AuditAction::Reset, "Bob", "Secretariat"))
            .is_err());
    }
}
