//! `relaybot run` — Serve the assistant on Telegram.

use std::sync::Arc;

use relaybot_channels::{TelegramChannel, TelegramConfig};
use relaybot_core::channel::Channel;
use relaybot_core::MISSING_API_KEY_WARNING;
use tracing::{info, warn};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    if config.telegram.bot_token.as_deref().is_none_or(str::is_empty) {
        eprintln!();
        eprintln!("  ERROR: No Telegram bot token configured!");
        eprintln!();
        eprintln!("  Set TELEGRAM_TOKEN or add it to your config file:");
        eprintln!("    {}", relaybot_config::AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No Telegram bot token found. See above for setup instructions.".into());
    }
    if !config.has_api_key() {
        warn!("{MISSING_API_KEY_WARNING}");
    }

    let telegram = TelegramConfig::from(&config.telegram);
    let runtime = super::assemble(config).await?;
    let channel: Arc<dyn Channel> = Arc::new(TelegramChannel::new(telegram));

    println!("🤖 relaybot is running on Telegram. Press Ctrl+C to stop.");

    tokio::select! {
        result = relaybot_agent::serve(runtime.assistant.clone(), channel.clone()) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    channel.stop().await?;
    println!("👋 Stopped.");
    Ok(())
}
