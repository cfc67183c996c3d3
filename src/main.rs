//! wg-panel-bot: Telegram-бот для панели управления WireGuard.

mod api;
mod bot;
mod config;
mod peer;
mod render;

use bot::handlers::State;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::Dispatcher;
use teloxide::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/etc/wg-panel-bot/config.toml"));
    let interactive = std::io::stdin().is_terminal();
    tracing::info!(
        config_path = %config_path.display(),
        interactive = interactive,
        "Starting wg-panel-bot"
    );

    let config = Arc::new(config::Config::load(&config_path, interactive)?);
    if config.admin_ids.is_empty() {
        tracing::warn!("admin_ids is empty, every Telegram user can control the panel");
    }
    tracing::info!(
        base_url = %config.base_url,
        admin_count = config.admin_ids.len(),
        request_timeout_secs = config.request_timeout_secs,
        render_qr_locally = config.render_qr_locally,
        "Configuration loaded"
    );

    let api = Arc::new(api::ApiClient::from_config(&config)?);
    let bot = Bot::new(config.bot_token.clone());
    let state = bot::handlers::BotState { config, api };
    tracing::info!("Dispatcher initialized, bot is ready");

    Dispatcher::builder(bot, bot::handlers::schema())
        .dependencies(dptree::deps![state, InMemStorage::<State>::new()])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
