//! Channel trait — the abstraction over messaging transports.
//!
//! A Channel connects relaybot to a messaging platform (Telegram, CLI).
//! It delivers normalized inbound events, with media already downloaded,
//! and accepts text replies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ChannelError;
use crate::message::UserId;

/// Unique identifier for a channel instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message received from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// The channel this event came from
    pub channel_id: ChannelId,

    /// Sender identifier (platform-specific user ID)
    pub sender_id: String,

    /// Human-readable sender name (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    /// The chat/DM identifier replies are sent to
    pub chat_id: String,

    /// Message text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Caption attached to a media message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Raw image bytes (largest available size)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,

    /// Voice note or audio file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioClip>,
}

impl InboundEvent {
    /// A plain text event.
    pub fn text(
        channel_id: ChannelId,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel_id,
            sender_id: sender_id.into(),
            sender_name: None,
            chat_id: chat_id.into(),
            text: Some(text.into()),
            caption: None,
            image: None,
            audio: None,
        }
    }

    /// The conversation owner for this event.
    pub fn user_id(&self) -> UserId {
        UserId::new(self.sender_id.clone())
    }
}

/// Downloaded audio payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// An outgoing reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    /// Render lightweight Markdown markup when the platform supports it.
    #[serde(default)]
    pub markdown: bool,
}

impl Reply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: false,
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: true,
        }
    }
}

/// The core Channel trait.
///
/// Implementations handle platform-specific connection logic, media download,
/// message formatting, and sender allowlisting.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "telegram", "cli").
    fn name(&self) -> &str;

    /// Unique ID for this channel instance.
    fn id(&self) -> &ChannelId;

    /// Start listening for incoming events.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<InboundEvent, ChannelError>>,
        ChannelError,
    >;

    /// Send a reply to a specific chat.
    async fn send(&self, chat_id: &str, reply: &Reply) -> std::result::Result<(), ChannelError>;

    /// Send a typing indicator (if the platform supports it).
    async fn send_typing(&self, _chat_id: &str) -> std::result::Result<(), ChannelError> {
        Ok(())
    }

    /// Check if a sender is allowed (allowlist check).
    fn is_allowed(&self, sender_id: &str) -> bool;

    /// Stop the channel gracefully.
    async fn stop(&self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }

    /// Health check — is the channel connected and operational?
    async fn health_check(&self) -> std::result::Result<bool, ChannelError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_event_creation() {
        let event = InboundEvent::text(ChannelId("telegram".into()), "12345", "67890", "Hello bot!");
        assert_eq!(event.channel_id.0, "telegram");
        assert_eq!(event.text.as_deref(), Some("Hello bot!"));
        assert_eq!(event.user_id(), UserId::from("12345"));
        assert!(event.image.is_none());
    }

    #[test]
    fn event_serialization_skips_empty_media() {
        let event = InboundEvent::text(ChannelId("cli".into()), "u", "c", "hi");
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("image"));
        assert!(!json.contains("audio"));
    }
}
