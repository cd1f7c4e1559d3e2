use std::sync::Arc;

use tracing::{error, info};

use kb_core::config::Config;

mod health;

#[tokio::main]
async fn main() -> Result<(), kb_core::Error> {
    kb_core::logging::init("kb")?;

    let cfg = Arc::new(Config::load()?);

    if let Some(addr) = cfg.health_bind {
        tokio::spawn(async move {
            if let Err(e) = health::serve(addr).await {
                error!(%addr, error = %e, "health endpoint stopped");
            }
        });
    }

    info!(roster = cfg.roster.len(), "starting key holder bot");
    kb_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| kb_core::Error::Transport(format!("telegram bot failed: {e}")))?;

    Ok(())
}
