//! Recent Gmail messages (metadata only).

use async_trait::async_trait;
use futures::future::try_join_all;
use relaybot_core::error::IntegrationError;
use relaybot_core::integration::Integration;
use serde::Deserialize;
use std::sync::Arc;

use crate::google::GoogleClient;

pub struct Gmail {
    google: Arc<GoogleClient>,
    max_results: u32,
}

impl Gmail {
    pub fn new(google: Arc<GoogleClient>, max_results: u32) -> Self {
        Self { google, max_results }
    }
}

#[derive(Debug, Default, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageMetadata {
    #[serde(default)]
    pub payload: Payload,
}

#[derive(Debug, Default, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl MessageMetadata {
    fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

pub fn format_messages(messages: &[MessageMetadata]) -> String {
    if messages.is_empty() {
        return "No emails found.".into();
    }
    let mut text = String::from("*Recent emails:*\n");
    for message in messages {
        text.push_str(&format!(
            "• *Subject:* {}\n  *From:* {}\n  *Date:* {}\n\n",
            message.header("Subject").unwrap_or("(no subject)"),
            message.header("From").unwrap_or("Unknown"),
            message.header("Date").unwrap_or("No date"),
        ));
    }
    text
}

#[async_trait]
impl Integration for Gmail {
    fn name(&self) -> &str {
        "gmail"
    }

    fn description(&self) -> &str {
        "List recent emails, optionally filtered by a Gmail search query"
    }

    async fn query(&self, args: &str) -> Result<String, IntegrationError> {
        let list: MessageList = self
            .google
            .get(
                &self.google.api_url("/gmail/v1/users/me/messages"),
                &[
                    ("q", args.trim().to_string()),
                    ("maxResults", self.max_results.to_string()),
                ],
            )
            .await?;

        let details = try_join_all(list.messages.iter().map(|message| async move {
            let url = self
                .google
                .api_url(&format!("/gmail/v1/users/me/messages/{}", message.id));
            let query = [
                ("format", "metadata".to_string()),
                ("metadataHeaders", "From".to_string()),
                ("metadataHeaders", "Subject".to_string()),
                ("metadataHeaders", "Date".to_string()),
            ];
            self.google.get::<MessageMetadata>(&url, &query).await
        }))
        .await?;

        Ok(format_messages(&details))
    }
}
