//! Upcoming Google Calendar events.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use relaybot_core::error::IntegrationError;
use relaybot_core::integration::Integration;
use serde::Deserialize;
use std::sync::Arc;

use crate::google::GoogleClient;

pub struct Calendar {
    google: Arc<GoogleClient>,
    calendar_id: String,
    max_results: u32,
}

impl Calendar {
    pub fn new(google: Arc<GoogleClient>, calendar_id: impl Into<String>, max_results: u32) -> Self {
        Self {
            google,
            calendar_id: calendar_id.into(),
            max_results,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<Event>,
}

#[derive(Debug, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: EventTime,
}

/// Timed events carry `dateTime`; all-day events carry `date`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

pub fn format_events(events: &[Event]) -> String {
    if events.is_empty() {
        return "No upcoming events found.".into();
    }
    let mut text = String::from("*Upcoming events:*\n");
    for event in events {
        let start = event
            .start
            .date_time
            .as_deref()
            .or(event.start.date.as_deref())
            .unwrap_or("unknown time");
        text.push_str(&format!(
            "• {} — {}\n",
            event.summary.as_deref().unwrap_or("(No title)"),
            start
        ));
    }
    text
}

#[async_trait]
impl Integration for Calendar {
    fn name(&self) -> &str {
        "calendar"
    }

    fn description(&self) -> &str {
        "List upcoming calendar events"
    }

    async fn query(&self, _args: &str) -> Result<String, IntegrationError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let list: EventList = self
            .google
            .get(
                &self
                    .google
                    .api_url(&format!("/calendar/v3/calendars/{}/events", self.calendar_id)),
                &[
                    ("timeMin", now),
                    ("maxResults", self.max_results.to_string()),
                    ("singleEvents", "true".to_string()),
                    ("orderBy", "startTime".to_string()),
                ],
            )
            .await?;
        Ok(format_events(&list.items))
    }
}
