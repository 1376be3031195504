//! `relaybot doctor` — Diagnose configuration and connectivity.

use relaybot_channels::{TelegramChannel, TelegramConfig};
use relaybot_config::AppConfig;
use relaybot_core::channel::Channel;
use relaybot_providers::DispatchClient;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 relaybot Doctor — System Diagnostics");
    println!("=======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults and environment (run `relaybot onboard`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the configuration before running other checks.");
            return Ok(());
        }
    };

    // Model backend
    let dispatch = DispatchClient::from_config(&config);
    if !dispatch.is_enabled() {
        println!("  ⚠️  No API key configured, replies will be a configuration warning");
        issues += 1;
    } else if dispatch.health_check().await {
        println!("  ✅ Model backend reachable ({})", config.api_url);
    } else {
        println!("  ❌ Model backend unreachable or key rejected ({})", config.api_url);
        issues += 1;
    }

    // Conversation store
    match super::open_store(&config).await {
        Ok(_) => println!("  ✅ Database ready ({})", config.database_url()),
        Err(e) => {
            println!("  ❌ Database unavailable: {e}");
            issues += 1;
        }
    }

    // Telegram
    if config.telegram.bot_token.as_deref().is_none_or(str::is_empty) {
        println!("  ⚠️  No Telegram bot token, only `relaybot chat` is available");
        issues += 1;
    } else {
        let channel = TelegramChannel::new(TelegramConfig::from(&config.telegram));
        match channel.health_check().await {
            Ok(true) => println!("  ✅ Telegram bot token accepted"),
            _ => {
                println!("  ❌ Telegram rejected the bot token or is unreachable");
                issues += 1;
            }
        }
        if config.telegram.allowed_users.is_empty() {
            println!("  ⚠️  Telegram allowlist is empty, every sender will be ignored");
            issues += 1;
        }
    }

    // Integrations
    let integrations = [
        ("search", config.search.api_key.is_some() && config.search.cx.is_some()),
        ("gmail/drive/calendar/docs", config.google.access_token.is_some()),
        (
            "app_status",
            config.external_app.base_url.is_some()
                && config.external_app.username.is_some()
                && config.external_app.password.is_some(),
        ),
    ];
    for (name, configured) in integrations {
        if configured {
            println!("  ✅ Integration {name} configured");
        } else {
            println!("  ➖ Integration {name} not configured");
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
