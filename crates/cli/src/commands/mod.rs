pub mod chat;
pub mod doctor;
pub mod history;
pub mod onboard;
pub mod run;

use std::sync::Arc;

use relaybot_agent::{Assistant, Exchange, RequestBuilder};
use relaybot_config::AppConfig;
use relaybot_memory::SqliteBackend;
use relaybot_providers::DispatchClient;

/// Everything a serving command needs, wired from one config.
pub struct Runtime {
    pub config: AppConfig,
    pub store: Arc<SqliteBackend>,
    pub assistant: Arc<Assistant>,
}

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Open the conversation database, creating the default directory if needed.
pub async fn open_store(config: &AppConfig) -> Result<Arc<SqliteBackend>, Box<dyn std::error::Error>> {
    if config.database_path.is_none() {
        std::fs::create_dir_all(AppConfig::config_dir())?;
    }
    Ok(Arc::new(SqliteBackend::new(&config.database_url()).await?))
}

pub async fn assemble(config: AppConfig) -> Result<Runtime, Box<dyn std::error::Error>> {
    let store = open_store(&config).await?;
    let exchange = Exchange::new(store.clone(), DispatchClient::from_config(&config))
        .with_history_limit(config.history_limit)
        .with_builder(RequestBuilder::new(config.jpeg_quality));
    let integrations = Arc::new(relaybot_tools::default_registry(&config));
    let assistant = Arc::new(Assistant::new(exchange, store.clone(), integrations));

    Ok(Runtime {
        config,
        store,
        assistant,
    })
}
