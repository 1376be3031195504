//! Web search via the Google Custom Search JSON API.

use async_trait::async_trait;
use relaybot_config::SearchConfig;
use relaybot_core::error::IntegrationError;
use relaybot_core::integration::Integration;
use serde::Deserialize;
use tracing::debug;

pub const SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

pub struct WebSearch {
    client: reqwest::Client,
    api_key: Option<String>,
    cx: Option<String>,
    num_results: u32,
    url: String,
}

impl WebSearch {
    pub fn new(api_key: Option<String>, cx: Option<String>, num_results: u32) -> Self {
        Self {
            client: crate::http_client(),
            api_key: api_key.filter(|k| !k.is_empty()),
            cx: cx.filter(|c| !c.is_empty()),
            num_results: num_results.clamp(1, 10),
            url: SEARCH_URL.into(),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.api_key.clone(), config.cx.clone(), config.num_results)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// Render results as a Markdown list of links with italic snippets.
pub fn format_results(items: &[SearchItem]) -> String {
    if items.is_empty() {
        return "No results found.".into();
    }
    let mut text = String::from("*Search Results:*\n");
    for item in items {
        text.push_str(&format!(
            "• [{}]({})\n_{}_\n\n",
            item.title,
            item.link,
            item.snippet.replace('\n', " ")
        ));
    }
    text
}

#[async_trait]
impl Integration for WebSearch {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search the web and return the top results"
    }

    async fn query(&self, args: &str) -> Result<String, IntegrationError> {
        let (Some(key), Some(cx)) = (&self.api_key, &self.cx) else {
            return Err(IntegrationError::NotConfigured(
                "⚠️ Google Search API Key or CX not configured.".into(),
            ));
        };
        let query = args.trim();
        if query.is_empty() {
            return Err(IntegrationError::InvalidArguments("empty search query".into()));
        }

        debug!(query = %query, num = self.num_results, "Running web search");
        let num = self.num_results.to_string();
        let response: SearchResponse = crate::fetch_json(self.client.get(&self.url).query(&[
            ("key", key.as_str()),
            ("cx", cx.as_str()),
            ("q", query),
            ("num", num.as_str()),
        ]))
        .await?;

        Ok(format_results(&response.items))
    }
}
