//! Conversation turns and model request messages.
//!
//! These are the value objects that flow through the dispatch path:
//! the store yields `ConversationTurn`s, the builder reads them through a
//! `ConversationWindow` and produces `RequestMessage`s for the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, stable identifier of a conversation owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// One persisted turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Store-assigned sequence number; breaks ties between equal timestamps.
    pub id: i64,

    /// Who owns this conversation
    pub user_id: UserId,

    /// Who said it
    pub role: Role,

    /// Plain text; media turns are logged as their resulting text
    pub content: String,

    /// When the turn was appended
    pub created_at: DateTime<Utc>,
}

/// A history record as seen by the request builder.
///
/// Both fields are optional so that records read back from external sources
/// can be carried through and filtered instead of rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub role: Option<Role>,

    #[serde(default)]
    pub content: Option<String>,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            content: Some(content.into()),
        }
    }

    /// Returns the role and content when both are present and non-empty.
    pub fn well_formed(&self) -> Option<(Role, &str)> {
        let role = self.role?;
        let content = self.content.as_deref().filter(|c| !c.is_empty())?;
        Some((role, content))
    }
}

impl From<&ConversationTurn> for HistoryEntry {
    fn from(turn: &ConversationTurn) -> Self {
        Self::new(turn.role, turn.content.clone())
    }
}

/// The most recent turns of one user, oldest first.
///
/// Derived on every request and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationWindow {
    pub entries: Vec<HistoryEntry>,
}

impl ConversationWindow {
    /// An empty window (a user with no prior turns).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a window from turns that are already in chronological order.
    pub fn from_turns(turns: &[ConversationTurn]) -> Self {
        Self {
            entries: turns.iter().map(HistoryEntry::from).collect(),
        }
    }

    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A single message in a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl RequestMessage {
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
        }
    }

    /// A user message carrying a text prompt and one image reference.
    pub fn user_with_image(prompt: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: prompt.into(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.into(),
                    },
                },
            ]),
        }
    }

    /// The text of this message, ignoring any image parts.
    pub fn text_content(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// The image reference carried by this message, if any.
    pub fn image_url(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(_) => None,
            MessageContent::Parts(parts) => parts.iter().find_map(|p| match p {
                ContentPart::ImageUrl { image_url } => Some(image_url.url.as_str()),
                ContentPart::Text { .. } => None,
            }),
        }
    }
}

/// Message content: plain text or a list of typed parts.
///
/// Serializes to the OpenAI chat format (`"content": "..."` or
/// `"content": [{"type": "text", ...}, {"type": "image_url", ...}]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(id: i64, role: Role, content: &str) -> ConversationTurn {
        ConversationTurn {
            id,
            user_id: UserId::from("42"),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn role_parses_and_displays() {
        assert_eq!("assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert_eq!(Role::User.to_string(), "user");
        assert!("moderator".parse::<Role>().is_err());
    }

    #[test]
    fn window_preserves_turn_order() {
        let turns = vec![turn(1, Role::User, "hi"), turn(2, Role::Assistant, "hello")];
        let window = ConversationWindow::from_turns(&turns);
        assert_eq!(window.len(), 2);
        assert_eq!(window.entries[0].content.as_deref(), Some("hi"));
        assert_eq!(window.entries[1].role, Some(Role::Assistant));
    }

    #[test]
    fn history_entry_well_formed_requires_both_fields() {
        assert!(HistoryEntry::new(Role::User, "x").well_formed().is_some());
        assert!(HistoryEntry { role: None, content: Some("x".into()) }.well_formed().is_none());
        assert!(HistoryEntry { role: Some(Role::User), content: None }.well_formed().is_none());
        assert!(HistoryEntry::new(Role::User, "").well_formed().is_none());
    }

    #[test]
    fn history_entry_deserializes_with_missing_fields() {
        let entries: Vec<HistoryEntry> =
            serde_json::from_str(r#"[{"role":"user","content":"hi"},{"content":"orphan"},{}]"#)
                .unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[1].role.is_none());
        assert!(entries[2].content.is_none());
    }

    #[test]
    fn plain_message_serializes_as_string_content() {
        let msg = RequestMessage::text(Role::User, "how are you");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "how are you");
    }

    #[test]
    fn image_message_serializes_as_parts() {
        let msg = RequestMessage::user_with_image("what is this", "data:image/jpeg;base64,AAAA");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "what is this");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(json["content"][1]["image_url"]["url"], "data:image/jpeg;base64,AAAA");
        assert_eq!(msg.text_content(), "what is this");
        assert_eq!(msg.image_url(), Some("data:image/jpeg;base64,AAAA"));
    }
}
