//! Messaging channels for relaybot.
//!
//! Each channel connects to a chat transport and relays normalized events
//! to the assistant, with media already downloaded.
//!
//! Available channels:
//! - **Telegram**: Bot API long polling
//! - **CLI**: interactive terminal chat (stdin/stdout)

pub mod cli;
pub mod telegram;

pub use cli::CliChannel;
pub use telegram::{TelegramChannel, TelegramConfig};

use relaybot_config::TelegramSettings;

impl From<&TelegramSettings> for TelegramConfig {
    fn from(settings: &TelegramSettings) -> Self {
        let mut config = TelegramConfig::new(
            settings.bot_token.clone().unwrap_or_default(),
            settings.allowed_users.clone(),
        );
        config.poll_timeout_secs = settings.poll_timeout_secs;
        config
    }
}
