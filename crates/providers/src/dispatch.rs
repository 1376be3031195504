//! Dispatch client: the single entry point for model calls.
//!
//! Built once from configuration. Without an API key the client is
//! [`DispatchClient::Disabled`] and answers every call with the fixed
//! configuration warning, without touching the network.

use std::sync::Arc;

use relaybot_config::AppConfig;
use relaybot_core::error::DispatchError;
use relaybot_core::message::RequestMessage;
use relaybot_core::provider::{
    CompletionRequest, GenerationParams, Provider, TranscriptionRequest, TRANSCRIPTION_MODEL,
};
use tracing::{debug, info, warn};

use crate::openai_compat::OpenAiCompatProvider;

/// Issues completion and transcription calls against the configured backend.
#[derive(Clone)]
pub enum DispatchClient {
    Enabled {
        provider: Arc<dyn Provider>,
        params: GenerationParams,
    },
    Disabled,
}

impl DispatchClient {
    /// Wrap a provider with the fixed generation parameters.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self::Enabled {
            provider,
            params: GenerationParams::default(),
        }
    }

    pub fn disabled() -> Self {
        Self::Disabled
    }

    /// Build the client from configuration.
    ///
    /// A missing API key yields the disabled variant.
    pub fn from_config(config: &AppConfig) -> Self {
        match config.api_key.as_deref() {
            Some(key) if !key.is_empty() => {
                info!(provider = %config.provider, url = %config.api_url, "Model dispatch enabled");
                Self::new(Arc::new(OpenAiCompatProvider::new(
                    config.provider.clone(),
                    config.api_url.clone(),
                    key,
                )))
            }
            _ => {
                warn!("No API key configured, model dispatch disabled");
                Self::Disabled
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    /// Name of the backing provider, if any.
    pub fn provider_name(&self) -> Option<&str> {
        match self {
            Self::Enabled { provider, .. } => Some(provider.name()),
            Self::Disabled => None,
        }
    }

    /// Send `messages` to `model` and return the first choice's text.
    pub async fn complete(
        &self,
        messages: Vec<RequestMessage>,
        model: &str,
    ) -> Result<String, DispatchError> {
        let (provider, params) = match self {
            Self::Enabled { provider, params } => (provider, params),
            Self::Disabled => return Err(DispatchError::NotConfigured),
        };

        let request = CompletionRequest {
            model: model.to_string(),
            messages,
            params: params.clone(),
        };

        match provider.complete(request).await {
            Ok(response) => {
                if let Some(usage) = &response.usage {
                    debug!(
                        model = %response.model,
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        "Completion received"
                    );
                }
                Ok(response.content)
            }
            Err(e) => {
                warn!(provider = %provider.name(), model, error = %e, "Completion failed");
                Err(DispatchError::Completion(e))
            }
        }
    }

    /// Transcribe an audio clip with the fixed speech-to-text model.
    pub async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String, DispatchError> {
        let provider = match self {
            Self::Enabled { provider, .. } => provider,
            Self::Disabled => return Err(DispatchError::NotConfigured),
        };

        let request = TranscriptionRequest {
            model: TRANSCRIPTION_MODEL.to_string(),
            audio,
            filename: filename.to_string(),
        };

        provider.transcribe(request).await.map_err(|e| {
            warn!(provider = %provider.name(), error = %e, "Transcription failed");
            DispatchError::Transcription(e)
        })
    }

    /// Backend reachability. Always false when disabled.
    pub async fn health_check(&self) -> bool {
        match self {
            Self::Enabled { provider, .. } => provider.health_check().await.unwrap_or(false),
            Self::Disabled => false,
        }
    }
}

impl std::fmt::Debug for DispatchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enabled { provider, params } => f
                .debug_struct("Enabled")
                .field("provider", &provider.name())
                .field("params", params)
                .finish(),
            Self::Disabled => f.write_str("Disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relaybot_core::error::ProviderError;
    use relaybot_core::message::Role;
    use relaybot_core::provider::CompletionResponse;
    use relaybot_core::MISSING_API_KEY_WARNING;
    use std::sync::Mutex;

    /// Records every request and replies from a fixed script.
    struct RecordingProvider {
        reply: std::result::Result<String, ProviderError>,
        requests: Mutex<Vec<CompletionRequest>>,
        transcriptions: Mutex<Vec<TranscriptionRequest>>,
    }

    impl RecordingProvider {
        fn ok(text: &str) -> Self {
            Self {
                reply: Ok(text.into()),
                requests: Mutex::new(Vec::new()),
                transcriptions: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: ProviderError) -> Self {
            Self {
                reply: Err(err),
                requests: Mutex::new(Vec::new()),
                transcriptions: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ProviderError> {
            let model = request.model.clone();
            self.requests.lock().unwrap().push(request);
            self.reply.clone().map(|content| CompletionResponse {
                content,
                model,
                usage: None,
            })
        }

        async fn transcribe(
            &self,
            request: TranscriptionRequest,
        ) -> std::result::Result<String, ProviderError> {
            self.transcriptions.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn disabled_returns_fixed_warning() {
        let client = DispatchClient::disabled();
        let err = client
            .complete(vec![RequestMessage::text(Role::User, "hi")], "any")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), MISSING_API_KEY_WARNING);

        let err = client.transcribe(vec![1, 2, 3], "voice.ogg").await.unwrap_err();
        assert!(err.is_not_configured());
        assert!(!client.health_check().await);
    }

    #[test]
    fn missing_key_in_config_builds_disabled_client() {
        let config = AppConfig::default();
        let client = DispatchClient::from_config(&config);
        assert!(!client.is_enabled());
        assert!(client.provider_name().is_none());
    }

    #[test]
    fn key_in_config_builds_enabled_client() {
        let config = AppConfig {
            api_key: Some("gsk-test".into()),
            ..AppConfig::default()
        };
        let client = DispatchClient::from_config(&config);
        assert!(client.is_enabled());
        assert_eq!(client.provider_name(), Some("groq"));
    }

    #[tokio::test]
    async fn complete_uses_fixed_params_and_given_model() {
        let provider = Arc::new(RecordingProvider::ok("Hello!"));
        let client = DispatchClient::new(provider.clone());

        let text = client
            .complete(vec![RequestMessage::text(Role::User, "hi")], "llama-3.3-70b-versatile")
            .await
            .unwrap();
        assert_eq!(text, "Hello!");

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "llama-3.3-70b-versatile");
        assert_eq!(requests[0].params, GenerationParams::default());
    }

    #[tokio::test]
    async fn backend_failure_maps_to_prefixed_error() {
        let provider = Arc::new(RecordingProvider::failing(ProviderError::Network(
            "connection reset".into(),
        )));
        let client = DispatchClient::new(provider);

        let err = client
            .complete(vec![RequestMessage::text(Role::User, "hi")], "m")
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Error communicating"));
        assert!(text.contains("connection reset"));
    }

    #[tokio::test]
    async fn transcribe_uses_whisper_model() {
        let provider = Arc::new(RecordingProvider::ok("remind me tomorrow"));
        let client = DispatchClient::new(provider.clone());

        let text = client.transcribe(vec![0u8; 16], "voice.ogg").await.unwrap();
        assert_eq!(text, "remind me tomorrow");

        let calls = provider.transcriptions.lock().unwrap();
        assert_eq!(calls[0].model, "whisper-large-v3");
        assert_eq!(calls[0].filename, "voice.ogg");
    }

    #[tokio::test]
    async fn transcription_failure_maps_to_prefixed_error() {
        let provider = Arc::new(RecordingProvider::failing(ProviderError::AuthenticationFailed(
            "bad key".into(),
        )));
        let client = DispatchClient::new(provider);
        let err = client.transcribe(vec![1], "a.mp3").await.unwrap_err();
        assert!(err.to_string().starts_with("Error transcribing audio: "));
    }
}
