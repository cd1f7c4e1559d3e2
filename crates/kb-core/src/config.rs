use std::{
    env,
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::FixedOffset;

use crate::{
    errors::Error,
    formatting::parse_utc_offset,
    roster::{Roster, DEFAULT_HOLDER},
    Result,
};

/// Typed configuration, read from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    // Persistence
    pub state_file: PathBuf,
    pub log_file: PathBuf,

    // Roster
    pub roster: Roster,

    // Display
    pub display_offset: FixedOffset,
    pub transport_timeout: Duration,

    // Liveness probe (disabled when unset)
    pub health_bind: Option<SocketAddr>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| get(key).and_then(non_empty);

        let telegram_bot_token = var("BOT_TOKEN")
            .or_else(|| var("TELEGRAM_BOT_TOKEN"))
            .ok_or_else(|| {
                Error::Config("BOT_TOKEN environment variable is required".to_string())
            })?;

        let state_file = PathBuf::from(var("STATE_FILE").unwrap_or("state.json".to_string()));
        let log_file = PathBuf::from(var("LOG_FILE").unwrap_or("log.csv".to_string()));

        let default_holder = var("KEY_DEFAULT_HOLDER").unwrap_or(DEFAULT_HOLDER.to_string());
        let roster = match parse_csv(var("KEY_ROSTER")) {
            Some(names) => Roster::new(names, &default_holder)?,
            None if default_holder == DEFAULT_HOLDER => Roster::default(),
            None => {
                return Err(Error::Config(
                    "KEY_DEFAULT_HOLDER requires KEY_ROSTER to be set".to_string(),
                ))
            }
        };

        // Brasília has had no DST since 2019.
        let display_offset = match var("DISPLAY_UTC_OFFSET") {
            Some(raw) => parse_utc_offset(&raw).ok_or_else(|| {
                Error::Config(format!("DISPLAY_UTC_OFFSET is not an offset: {raw}"))
            })?,
            None => FixedOffset::west_opt(3 * 3600)
                .ok_or_else(|| Error::Config("invalid default offset".to_string()))?,
        };

        let transport_timeout = Duration::from_millis(
            var("TRANSPORT_TIMEOUT_MS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(10_000)
                .max(100),
        );

        let health_bind = match (var("HEALTH_BIND"), var("PORT")) {
            (Some(addr), _) => Some(addr.trim().parse::<SocketAddr>().map_err(|e| {
                Error::Config(format!("HEALTH_BIND is not a socket address: {e}"))
            })?),
            (None, Some(port)) => {
                let port = port
                    .trim()
                    .parse::<u16>()
                    .map_err(|e| Error::Config(format!("PORT is not a port number: {e}")))?;
                Some(SocketAddr::from(([0, 0, 0, 0], port)))
            }
            (None, None) => None,
        };

        Ok(Self {
            telegram_bot_token,
            state_file,
            log_file,
            roster,
            display_offset,
            transport_timeout,
            health_bind,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn parse_csv(v: Option<String>) -> Option<Vec<String>> {
    let out = v?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
