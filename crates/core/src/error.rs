//! Error types for the relaybot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// Fixed warning returned whenever the model backend has no API key.
pub const MISSING_API_KEY_WARNING: &str =
    "⚠️ AI backend API key is missing. Please configure GROQ_API_KEY in the environment.";

/// The top-level error type for all relaybot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Dispatch errors ---
    #[error("{0}")]
    Dispatch(#[from] DispatchError),

    // --- Channel errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Storage errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Image normalization ---
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    // --- Integration errors ---
    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the model backend over the wire.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// The user-safe failure of a dispatch call.
///
/// The `Display` output of every variant is the exact text shown to the user
/// and logged as the assistant turn.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No API key was configured, so no request was attempted.
    #[error("{}", MISSING_API_KEY_WARNING)]
    NotConfigured,

    #[error("Error communicating with AI: {0}")]
    Completion(ProviderError),

    #[error("Error transcribing audio: {0}")]
    Transcription(ProviderError),
}

impl DispatchError {
    /// True when the failure came from missing configuration rather than the backend.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured)
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Message delivery failed to {channel}: {reason}")]
    DeliveryFailed { channel: String, reason: String },

    #[error("Media download failed: {0}")]
    DownloadFailed(String),

    /// An attachment on an inbound message could not be fetched; carries
    /// enough routing to tell the sender.
    #[error("Attachment from {sender_id} in chat {chat_id} unavailable: {reason}")]
    MediaUnavailable {
        sender_id: String,
        chat_id: String,
        reason: String,
    },

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),

    #[error("Invalid update payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// An image payload could not be normalized to JPEG bytes.
#[derive(Debug, Clone, Error)]
pub enum EncodingError {
    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("could not encode image as JPEG: {0}")]
    Encode(String),
}

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("Integration not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    NotConfigured(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Request failed: {0}")]
    Request(String),

    /// The remote API answered 401.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}
