//! Configuration loading, validation, and management for relaybot.
//!
//! Loads configuration from `~/.relaybot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.relaybot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model backend API key. Absent = dispatch disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Name of the model backend (used in logs)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL of the OpenAI-compatible backend
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Number of prior turns sent as context
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// JPEG quality used when re-encoding images (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// SQLite database file. Defaults to `~/.relaybot/relaybot.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,

    /// Telegram transport
    #[serde(default)]
    pub telegram: TelegramSettings,

    /// Web search integration
    #[serde(default)]
    pub search: SearchConfig,

    /// Google Workspace integrations
    #[serde(default)]
    pub google: GoogleConfig,

    /// External dashboard integration
    #[serde(default)]
    pub external_app: ExternalAppConfig,
}

fn default_provider() -> String {
    "groq".into()
}
fn default_api_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_history_limit() -> usize {
    10
}
fn default_jpeg_quality() -> u8 {
    75
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("history_limit", &self.history_limit)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("database_path", &self.database_path)
            .field("telegram", &self.telegram)
            .field("search", &self.search)
            .field("google", &self.google)
            .field("external_app", &self.external_app)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramSettings {
    /// Bot token from @BotFather
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Allowlist of sender IDs. Empty = deny all. ["*"] = allow all.
    #[serde(default = "default_allowed_users")]
    pub allowed_users: Vec<String>,

    /// Long-polling timeout passed to getUpdates
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_allowed_users() -> Vec<String> {
    vec!["*".into()]
}
fn default_poll_timeout() -> u64 {
    30
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            allowed_users: default_allowed_users(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &redact(&self.bot_token))
            .field("allowed_users", &self.allowed_users)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Programmable Search Engine id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cx: Option<String>,

    #[serde(default = "default_num_results")]
    pub num_results: u32,
}

fn default_num_results() -> u32 {
    3
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            cx: None,
            num_results: default_num_results(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("cx", &self.cx)
            .field("num_results", &self.num_results)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// OAuth access token with read-only Gmail/Drive/Calendar/Docs scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default = "default_google_max_results")]
    pub max_results: u32,

    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
}

fn default_google_max_results() -> u32 {
    5
}
fn default_calendar_id() -> String {
    "primary".into()
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            max_results: default_google_max_results(),
            calendar_id: default_calendar_id(),
        }
    }
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("access_token", &redact(&self.access_token))
            .field("max_results", &self.max_results)
            .field("calendar_id", &self.calendar_id)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ExternalAppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl std::fmt::Debug for ExternalAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalAppConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.relaybot/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides. Variables win over the file.
    ///
    /// `lookup` abstracts `std::env::var` so overrides can be tested.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("RELAYBOT_API_KEY").or_else(|| get("GROQ_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(url) = get("RELAYBOT_API_URL") {
            self.api_url = url;
        }
        if let Some(limit) = get("HISTORY_LIMIT") {
            self.history_limit = limit.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("HISTORY_LIMIT must be a positive integer, got '{limit}'"))
            })?;
        }
        if let Some(path) = get("RELAYBOT_DB") {
            self.database_path = Some(path);
        }
        if let Some(token) = get("TELEGRAM_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(users) = get("TELEGRAM_ALLOWED_USERS") {
            self.telegram.allowed_users = users
                .split(',')
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect();
        }
        if let Some(key) = get("GOOGLE_SEARCH_API_KEY") {
            self.search.api_key = Some(key);
        }
        if let Some(cx) = get("GOOGLE_SEARCH_CX") {
            self.search.cx = Some(cx);
        }
        if let Some(token) = get("GOOGLE_ACCESS_TOKEN") {
            self.google.access_token = Some(token);
        }
        if let Some(url) = get("APP_BASE_URL") {
            self.external_app.base_url = Some(url);
        }
        if let Some(user) = get("APP_USERNAME") {
            self.external_app.username = Some(user);
        }
        if let Some(password) = get("APP_PASSWORD") {
            self.external_app.password = Some(password);
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".relaybot")
    }

    /// SQLite connection string for the configured database file.
    pub fn database_url(&self) -> String {
        let path = self
            .database_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("relaybot.db").display().to_string());
        if path.starts_with("sqlite:") {
            path
        } else {
            format!("sqlite://{path}")
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.history_limit == 0 {
            return Err(ConfigError::ValidationError(
                "history_limit must be at least 1".into(),
            ));
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::ValidationError(
                "jpeg_quality must be between 1 and 100".into(),
            ));
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "api_url must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: default_api_url(),
            history_limit: default_history_limit(),
            jpeg_quality: default_jpeg_quality(),
            database_path: None,
            telegram: TelegramSettings::default(),
            search: SearchConfig::default(),
            google: GoogleConfig::default(),
            external_app: ExternalAppConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "groq");
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.jpeg_quality, 75);
        assert!(!config.has_api_key());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.api_url, config.api_url);
        assert_eq!(parsed.history_limit, config.history_limit);
    }

    #[test]
    fn zero_history_limit_rejected() {
        let config = AppConfig {
            history_limit: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn jpeg_quality_out_of_range_rejected() {
        let config = AppConfig {
            jpeg_quality: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider, "groq");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
api_key = "gsk-file"
history_limit = 4

[telegram]
allowed_users = ["111", "222"]

[search]
cx = "engine-1"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("gsk-file"));
        assert_eq!(config.history_limit, 4);
        assert_eq!(config.telegram.allowed_users, vec!["111", "222"]);
        assert_eq!(config.telegram.poll_timeout_secs, 30);
        assert_eq!(config.search.cx.as_deref(), Some("engine-1"));
        assert_eq!(config.search.num_results, 3);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "history_limit = \"many\"").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_win() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config
            .apply_env(env(&[
                ("GROQ_API_KEY", "gsk-env"),
                ("HISTORY_LIMIT", "6"),
                ("TELEGRAM_TOKEN", "123:abc"),
                ("TELEGRAM_ALLOWED_USERS", "1, 2 ,,3"),
                ("GOOGLE_SEARCH_CX", "cx-env"),
            ]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("gsk-env"));
        assert_eq!(config.history_limit, 6);
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.telegram.allowed_users, vec!["1", "2", "3"]);
        assert_eq!(config.search.cx.as_deref(), Some("cx-env"));
    }

    #[test]
    fn relaybot_key_takes_precedence_over_groq_key() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("GROQ_API_KEY", "groq"), ("RELAYBOT_API_KEY", "relay")]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("relay"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("GROQ_API_KEY", "  ")])).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn bad_history_limit_env_is_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("HISTORY_LIMIT", "ten")])).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn database_url_formats() {
        let mut config = AppConfig {
            database_path: Some("/var/lib/relaybot/bot.db".into()),
            ..AppConfig::default()
        };
        assert_eq!(config.database_url(), "sqlite:///var/lib/relaybot/bot.db");
        config.database_path = Some("sqlite::memory:".into());
        assert_eq!(config.database_url(), "sqlite::memory:");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = AppConfig {
            api_key: Some("gsk-secret".into()),
            ..AppConfig::default()
        };
        let out = format!("{config:?}");
        assert!(!out.contains("gsk-secret"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("api.groq.com"));
        assert!(toml_str.contains("history_limit = 10"));
    }
}
