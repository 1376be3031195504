//! Integration trait — read-only, one-shot queries against third-party APIs.
//!
//! Web search, mail listing, calendar listing and friends. Each integration
//! takes a free-form argument string and returns formatted text. The registry
//! never lets a failure escape: `run` always produces a displayable string.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::warn;
use crate::error::IntegrationError;

/// The core Integration trait.
#[async_trait]
pub trait Integration: Send + Sync {
    /// The unique name of this integration (e.g., "search", "gmail").
    fn name(&self) -> &str;

    /// A short description shown in help output.
    fn description(&self) -> &str;

    /// Run the query and return formatted (Markdown) text.
    async fn query(&self, args: &str) -> std::result::Result<String, IntegrationError>;
}

/// A registry of available integrations.
pub struct IntegrationRegistry {
    integrations: HashMap<String, Box<dyn Integration>>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self {
            integrations: HashMap::new(),
        }
    }

    /// Register an integration. Replaces any previous one with the same name.
    pub fn register(&mut self, integration: Box<dyn Integration>) {
        let name = integration.name().to_string();
        self.integrations.insert(name, integration);
    }

    /// Look up an integration by name.
    pub fn get(&self, name: &str) -> Option<&dyn Integration> {
        self.integrations.get(name).map(|i| i.as_ref())
    }

    /// Run a query, propagating the typed error.
    pub async fn query(&self, name: &str, args: &str) -> std::result::Result<String, IntegrationError> {
        let integration = self
            .integrations
            .get(name)
            .ok_or_else(|| IntegrationError::NotFound(name.to_string()))?;
        integration.query(args).await
    }

    /// Run a query and always return displayable text.
    pub async fn run(&self, name: &str, args: &str) -> String {
        match self.query(name, args).await {
            Ok(text) => text,
            Err(e) => {
                warn!(integration = %name, error = %e, "Integration query failed");
                format_failure(name, &e)
            }
        }
    }

    /// List all registered integration names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.integrations.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for IntegrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Text shown to the user when an integration fails.
pub fn format_failure(name: &str, err: &IntegrationError) -> String {
    match err {
        IntegrationError::NotConfigured(message) => message.clone(),
        other => format!("Error performing {name}: {other}"),
    }
}
