use tracing_subscriber::{fmt, EnvFilter};

use crate::Result;

/// Initialize tracing for the bot.
///
/// Default: info for our crates, warn for everything else. Can be overridden with
/// `RUST_LOG`.
pub fn init(service_name: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,kb=info,kb_core=info,kb_telegram=info,{service_name}=info"
        ))
    });

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init();

    Ok(())
}
