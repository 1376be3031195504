//! Read-only integrations for relaybot.
//!
//! Each integration answers one assistant command with formatted Markdown:
//! web search, recent Gmail messages, Drive files, upcoming Calendar
//! events, a Docs preview, and the external app dashboard.
//!
//! Integrations that lack credentials stay registered and answer with a
//! configuration warning instead of failing.

pub mod calendar;
pub mod docs;
pub mod drive;
pub mod external_app;
pub mod gmail;
pub mod google;
pub mod web_search;

use relaybot_config::AppConfig;
use relaybot_core::error::IntegrationError;
use relaybot_core::integration::IntegrationRegistry;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Create the registry with every integration, wired from configuration.
pub fn default_registry(config: &AppConfig) -> IntegrationRegistry {
    let mut registry = IntegrationRegistry::new();
    let google = Arc::new(google::GoogleClient::from_config(&config.google));

    registry.register(Box::new(web_search::WebSearch::from_config(&config.search)));
    registry.register(Box::new(gmail::Gmail::new(google.clone(), config.google.max_results)));
    registry.register(Box::new(drive::Drive::new(google.clone(), config.google.max_results)));
    registry.register(Box::new(calendar::Calendar::new(
        google.clone(),
        config.google.calendar_id.clone(),
        config.google.max_results,
    )));
    registry.register(Box::new(docs::Docs::new(google)));
    registry.register(Box::new(external_app::ExternalApp::from_config(&config.external_app)));
    registry
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Send a request and decode a JSON body, mapping failures to
/// [`IntegrationError`].
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, IntegrationError> {
    let response = request
        .send()
        .await
        .map_err(|e| IntegrationError::Request(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail: String = body.chars().take(200).collect();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(IntegrationError::Unauthorized(detail.trim().to_string()));
        }
        return Err(IntegrationError::Request(format!("HTTP {}: {}", status.as_u16(), detail.trim())));
    }

    response
        .json()
        .await
        .map_err(|e| IntegrationError::UnexpectedResponse(e.to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::Router;

    pub async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_every_integration() {
        let registry = default_registry(&AppConfig::default());
        assert_eq!(
            registry.names(),
            vec!["app_status", "calendar", "docs", "drive", "gmail", "search"]
        );
    }

    #[tokio::test]
    async fn unconfigured_integrations_answer_with_warnings() {
        let registry = default_registry(&AppConfig::default());

        let search = registry.run("search", "rust").await;
        assert_eq!(search, "⚠️ Google Search API Key or CX not configured.");

        for name in ["gmail", "drive", "calendar"] {
            let text = registry.run(name, "").await;
            assert!(text.starts_with("⚠️"), "{name}: {text}");
        }

        let app = registry.run("app_status", "").await;
        assert!(app.starts_with("⚠️"));
    }

    #[tokio::test]
    async fn fetch_json_types_unauthorized_responses() {
        use axum::http::StatusCode;
        use axum::routing::get;

        let app = axum::Router::new()
            .route("/denied", get(|| async { (StatusCode::UNAUTHORIZED, "token expired") }))
            .route("/broken", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }));
        let base = test_support::spawn_server(app).await;
        let client = http_client();

        let denied = fetch_json::<serde_json::Value>(client.get(format!("{base}/denied")))
            .await
            .unwrap_err();
        assert!(matches!(denied, IntegrationError::Unauthorized(ref m) if m == "token expired"));

        let broken = fetch_json::<serde_json::Value>(client.get(format!("{base}/broken")))
            .await
            .unwrap_err();
        assert!(matches!(broken, IntegrationError::Request(ref m) if m.starts_with("HTTP 500")));
    }
}
