//! Shared Google API access.
//!
//! Requests authenticate with a pre-issued OAuth access token carrying the
//! read-only scopes for Gmail, Drive, Calendar and Docs.

use relaybot_config::GoogleConfig;
use relaybot_core::error::IntegrationError;
use serde::de::DeserializeOwned;

pub const GOOGLE_API_BASE: &str = "https://www.googleapis.com";
pub const DOCS_API_BASE: &str = "https://docs.googleapis.com";

pub const NOT_CONFIGURED: &str = "⚠️ Google access token is not configured.";

/// Authenticated GET access to the Google REST APIs.
pub struct GoogleClient {
    client: reqwest::Client,
    access_token: Option<String>,
    api_base: String,
    docs_base: String,
}

impl GoogleClient {
    pub fn new(access_token: Option<String>) -> Self {
        Self {
            client: crate::http_client(),
            access_token: access_token.filter(|t| !t.is_empty()),
            api_base: GOOGLE_API_BASE.into(),
            docs_base: DOCS_API_BASE.into(),
        }
    }

    pub fn from_config(config: &GoogleConfig) -> Self {
        Self::new(config.access_token.clone())
    }

    /// Point both API roots somewhere else.
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        self.api_base = base.clone();
        self.docs_base = base;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.access_token.is_some()
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    pub(crate) fn docs_url(&self, path: &str) -> String {
        format!("{}{}", self.docs_base, path)
    }

    /// GET `url` with `query` and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, IntegrationError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| IntegrationError::NotConfigured(NOT_CONFIGURED.into()))?;

        crate::fetch_json(self.client.get(url).bearer_auth(token).query(query)).await
    }
}

impl std::fmt::Debug for GoogleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleClient")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_counts_as_missing() {
        assert!(!GoogleClient::new(Some(String::new())).is_configured());
        assert!(GoogleClient::new(Some("ya29.x".into())).is_configured());
    }

    #[test]
    fn debug_redacts_token() {
        let out = format!("{:?}", GoogleClient::new(Some("ya29.secret".into())));
        assert!(!out.contains("secret"));
    }

    #[tokio::test]
    async fn missing_token_is_not_configured() {
        let client = GoogleClient::new(None);
        let err = client
            .get::<serde_json::Value>(&client.api_url("/drive/v3/files"), &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), NOT_CONFIGURED);
    }
}
