//! `relaybot onboard` — First-time setup.

use relaybot_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🤖 relaybot — First-Time Setup");
    println!("==============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Add your Groq key as api_key (or export GROQ_API_KEY)");
        println!("   2. Add telegram.bot_token (or export TELEGRAM_TOKEN) to use Telegram");
        println!("   3. Run: relaybot chat   or   relaybot run\n");
    }

    println!("🎉 Setup complete! Run `relaybot doctor` to check your setup.\n");
    Ok(())
}
