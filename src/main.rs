mod chunker;
mod config;
mod formatting;
mod keepalive;
mod llm;
mod platform;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::llm::GeminiClient;
use crate::platform::{discord, telegram, Relay};

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets and RUST_LOG usually come from a .env file next to the binary
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let gemini = Arc::new(GeminiClient::new(&config.gemini));
    info!("Configuration loaded successfully");
    info!("  Model: {}", gemini.model());
    info!("  Gemini keys: {}", gemini.key_count());
    info!("  Keep-alive port: {}", config.keepalive.port);

    let relay = Arc::new(Relay::new(gemini));
    let bot = teloxide::Bot::new(&config.telegram.bot_token);

    // Each surface runs until it fails; one failing does not stop the others.
    let (keepalive_result, discord_result, telegram_result) = tokio::join!(
        keepalive::serve(config.keepalive.port),
        discord::run(relay.clone(), &config.discord.bot_token),
        telegram::run(relay, bot),
    );

    if let Err(e) = keepalive_result {
        error!("Keep-alive server stopped: {:#}", e);
    }
    if let Err(e) = discord_result {
        error!("Discord bot stopped: {:#}", e);
    }
    if let Err(e) = telegram_result {
        error!("Telegram bot stopped: {:#}", e);
    }

    Ok(())
}
