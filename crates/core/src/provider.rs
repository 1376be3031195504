//! Provider trait — the abstraction over the language-model backend.
//!
//! A Provider knows how to send a chat-completion request and how to
//! transcribe an audio clip. Implementations: OpenAI-compatible HTTP
//! endpoints (Groq, OpenAI, local servers) and test doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::RequestMessage;

/// Model used for speech-to-text.
pub const TRANSCRIPTION_MODEL: &str = "whisper-large-v3";

/// Sampling parameters sent with every completion.
///
/// The values are fixed; `Default` is the only constructor the dispatch
/// path uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Temperature (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Nucleus sampling width
    pub top_p: f32,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,

    /// Whether to stream the response
    pub stream: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            top_p: 1.0,
            stop: Vec::new(),
            stream: false,
        }
    }
}

/// A chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "llama-3.3-70b-versatile")
    pub model: String,

    /// The conversation messages, triggering message last
    pub messages: Vec<RequestMessage>,

    #[serde(flatten)]
    pub params: GenerationParams,
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Text of the first choice
    pub content: String,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// An audio clip to transcribe.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub model: String,
    pub audio: Vec<u8>,
    /// Original filename; the backend sniffs the container from the extension.
    pub filename: String,
}

/// The core Provider trait.
///
/// The dispatch client calls `complete()` or `transcribe()` without knowing
/// which backend is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "groq").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError>;

    /// Transcribe an audio clip to plain text.
    async fn transcribe(
        &self,
        _request: TranscriptionRequest,
    ) -> std::result::Result<String, ProviderError> {
        Err(ProviderError::NotConfigured(format!(
            "Provider '{}' does not support transcription",
            self.name()
        )))
    }

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn generation_params_are_fixed() {
        let params = GenerationParams::default();
        assert!((params.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(params.max_tokens, 1024);
        assert!((params.top_p - 1.0).abs() < f32::EPSILON);
        assert!(params.stop.is_empty());
        assert!(!params.stream);
    }

    #[test]
    fn completion_request_flattens_params() {
        let req = CompletionRequest {
            model: "llama-3.3-70b-versatile".into(),
            messages: vec![RequestMessage::text(Role::User, "hi")],
            params: GenerationParams::default(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["stream"], false);
        assert!(json.get("stop").is_none());
        assert_eq!(json["messages"][0]["content"], "hi");
    }
}
