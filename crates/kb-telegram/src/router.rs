use std::sync::Arc;

use teloxide::{
    dispatching::{DefaultKey, Dispatcher},
    dptree,
    prelude::*,
    RequestError,
};
use tracing::{info, warn};

use kb_core::{
    audit::AuditLog, config::Config, display::DisplaySync, engine::TransferEngine,
    messaging::port::MessagingPort, service::KeyService, state::StateStore,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub service: Arc<KeyService>,
}

/// Load persisted state and wire the engine to Telegram.
pub fn build_service(cfg: &Config, bot: Bot) -> KeyService {
    let engine = TransferEngine::open(
        cfg.roster.clone(),
        StateStore::new(&cfg.state_file),
        AuditLog::new(&cfg.log_file),
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot));
    let display = DisplaySync::new(messenger, cfg.transport_timeout, cfg.display_offset);

    KeyService::new(engine, display)
}

/// Route callback queries and messages to their handlers.
pub fn dispatcher(bot: Bot, state: Arc<AppState>) -> Dispatcher<Bot, RequestError, DefaultKey> {
    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());
    let service = Arc::new(build_service(&cfg, bot.clone()));

    // Basic startup info.
    match bot.get_me().await {
        Ok(me) => info!(username = %me.username(), "bot started"),
        Err(e) => warn!(error = %e, "getMe failed; continuing"),
    }

    let snapshot = service.snapshot().await;
    info!(
        holder = %snapshot.current_holder,
        updated_at = %snapshot.updated_at.to_rfc3339(),
        pinned = snapshot.display_ref.is_some(),
        roster = service.roster().len(),
        state_file = %cfg.state_file.display(),
        log_file = %cfg.log_file.display(),
        "key state loaded"
    );

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        service,
    });

    dispatcher(bot, state).dispatch().await;

    info!("bot stopped");
    Ok(())
}
