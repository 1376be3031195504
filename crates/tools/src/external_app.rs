//! External business app dashboard.
//!
//! Logs in with username and password, caches the bearer token, and reads
//! the dashboard summary. A rejected token triggers one fresh login.

use async_trait::async_trait;
use relaybot_config::ExternalAppConfig;
use relaybot_core::error::IntegrationError;
use relaybot_core::integration::Integration;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const NOT_CONFIGURED: &str = "⚠️ External app URL or credentials not configured.";

pub struct ExternalApp {
    client: reqwest::Client,
    base_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    token: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
pub struct Dashboard {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub pending_orders: Option<u64>,
    #[serde(default)]
    pub alerts: Option<u64>,
}

pub fn format_dashboard(dashboard: &Dashboard) -> String {
    let mut text = format!(
        "*App Status:*\nStatus: {}\nPending Orders: {}",
        dashboard.status.as_deref().unwrap_or("unknown"),
        dashboard
            .pending_orders
            .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
    );
    if let Some(alerts) = dashboard.alerts {
        text.push_str(&format!("\nAlerts: {alerts}"));
    }
    text
}

impl ExternalApp {
    pub fn new(base_url: Option<String>, username: Option<String>, password: Option<String>) -> Self {
        Self {
            client: crate::http_client(),
            base_url: base_url
                .filter(|u| !u.is_empty())
                .map(|u| u.trim_end_matches('/').to_string()),
            username: username.filter(|u| !u.is_empty()),
            password: password.filter(|p| !p.is_empty()),
            token: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ExternalAppConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            config.username.clone(),
            config.password.clone(),
        )
    }

    fn settings(&self) -> Result<(&str, &str, &str), IntegrationError> {
        match (&self.base_url, &self.username, &self.password) {
            (Some(url), Some(user), Some(pass)) => Ok((url.as_str(), user.as_str(), pass.as_str())),
            _ => Err(IntegrationError::NotConfigured(NOT_CONFIGURED.into())),
        }
    }

    async fn login(&self) -> Result<String, IntegrationError> {
        let (base, username, password) = self.settings()?;
        let response: LoginResponse = crate::fetch_json(
            self.client
                .post(format!("{base}/api/auth/login"))
                .json(&serde_json::json!({ "email": username, "password": password })),
        )
        .await
        .map_err(|e| match e {
            IntegrationError::Unauthorized(_) => {
                IntegrationError::Request("login rejected, check username and password".into())
            }
            other => other,
        })?;
        info!("Logged in to external app");
        Ok(response.token)
    }

    async fn fetch_dashboard(&self, base: &str, token: &str) -> Result<Dashboard, IntegrationError> {
        crate::fetch_json(
            self.client
                .get(format!("{base}/api/dashboard"))
                .bearer_auth(token),
        )
        .await
    }

    /// Read the dashboard, logging in first if no token is cached.
    ///
    /// The token lock is only held to read or replace the cached value,
    /// never across a request.
    pub async fn dashboard(&self) -> Result<Dashboard, IntegrationError> {
        let (base, _, _) = self.settings()?;
        let cached = self.token.lock().await.clone();

        if let Some(token) = cached {
            match self.fetch_dashboard(base, &token).await {
                Err(IntegrationError::Unauthorized(_)) => {
                    debug!("External app token rejected, logging in again");
                    self.token.lock().await.take();
                }
                other => return other,
            }
        }

        let token = self.login().await?;
        *self.token.lock().await = Some(token.clone());
        self.fetch_dashboard(base, &token).await
    }
}

#[async_trait]
impl Integration for ExternalApp {
    fn name(&self) -> &str {
        "app_status"
    }

    fn description(&self) -> &str {
        "Show the external app dashboard summary"
    }

    async fn query(&self, _args: &str) -> Result<String, IntegrationError> {
        Ok(format_dashboard(&self.dashboard().await?))
    }
}
