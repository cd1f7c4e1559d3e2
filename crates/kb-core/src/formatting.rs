//! Formatting utilities (Telegram HTML escaping, local timestamps).

use chrono::{DateTime, FixedOffset, Utc};

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `dd/mm/YYYY HH:MM` in the given fixed offset.
pub fn format_local_timestamp(ts: DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset).format("%d/%m/%Y %H:%M").to_string()
}

/// Parse `Z`/`UTC` or a signed `±HH:MM` offset.
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    s.parse::<FixedOffset>().ok()
}
