//! One request/response exchange with the model, plus turn logging.
//!
//! ```text
//! RECEIVED → WINDOWED → BUILT → DISPATCHED → LOGGED → REPLIED
//! ```
//!
//! A dispatch or encoding failure still reaches `LOGGED`: its display text
//! becomes the assistant turn and the reply. A storage failure aborts the
//! exchange and is returned to the caller.

use std::sync::Arc;

use relaybot_core::error::MemoryError;
use relaybot_core::memory::{ConversationStore, DEFAULT_HISTORY_LIMIT};
use relaybot_core::message::{Role, UserId};
use relaybot_providers::DispatchClient;
use tracing::{debug, info, warn};

use crate::builder::{ImagePayload, RequestBuilder};

/// Where an exchange stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExchangeState {
    Received,
    Windowed,
    Built,
    Dispatched,
    Logged,
    Replied,
}

/// The result of a completed exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeOutcome {
    /// Text for the user; also the logged assistant turn.
    pub reply: String,
    /// Model the request was addressed to, if a request was built.
    pub model: Option<&'static str>,
    /// False when `reply` is an error message.
    pub succeeded: bool,
    pub state: ExchangeState,
}

impl ExchangeOutcome {
    /// Mark the reply as delivered.
    pub fn replied(mut self) -> Self {
        self.state = ExchangeState::Replied;
        self
    }
}

/// Runs exchanges against one store and one dispatch client.
#[derive(Clone)]
pub struct Exchange {
    store: Arc<dyn ConversationStore>,
    dispatch: DispatchClient,
    builder: RequestBuilder,
    history_limit: usize,
}

impl Exchange {
    pub fn new(store: Arc<dyn ConversationStore>, dispatch: DispatchClient) -> Self {
        Self {
            store,
            dispatch,
            builder: RequestBuilder::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Number of prior turns sent as context.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_builder(mut self, builder: RequestBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn dispatch(&self) -> &DispatchClient {
        &self.dispatch
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Run one exchange for `user_id` and log both turns.
    pub async fn run(
        &self,
        user_id: &UserId,
        prompt: &str,
        image: Option<ImagePayload>,
    ) -> Result<ExchangeOutcome, MemoryError> {
        let mut state = ExchangeState::Received;
        debug!(user = %user_id, ?state, has_image = image.is_some());

        let window = self.store.window(user_id, self.history_limit).await?;
        state = ExchangeState::Windowed;
        debug!(user = %user_id, ?state, history = window.len());

        let (reply, model, succeeded) = match self.builder.build(&window, prompt, image.as_ref()) {
            Ok(built) => {
                state = ExchangeState::Built;
                debug!(user = %user_id, ?state, model = built.model, messages = built.messages.len());
                let result = self.dispatch.complete(built.messages, built.model).await;
                state = ExchangeState::Dispatched;
                debug!(user = %user_id, ?state, ok = result.is_ok());
                match result {
                    Ok(text) => (text, Some(built.model), true),
                    Err(e) => (e.to_string(), Some(built.model), false),
                }
            }
            Err(e) => {
                warn!(user = %user_id, ?state, error = %e, "Image normalization failed");
                (format!("Error processing image: {e}"), None, false)
            }
        };

        self.store.append(user_id, Role::User, prompt).await?;
        self.store.append(user_id, Role::Assistant, &reply).await?;
        state = ExchangeState::Logged;

        info!(
            user = %user_id,
            model = model.unwrap_or("-"),
            succeeded,
            "Exchange logged"
        );

        Ok(ExchangeOutcome {
            reply,
            model,
            succeeded,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relaybot_core::error::ProviderError;
    use relaybot_core::message::ConversationTurn;
    use relaybot_core::provider::{CompletionRequest, CompletionResponse, Provider};
    use relaybot_core::MISSING_API_KEY_WARNING;
    use relaybot_memory::InMemoryBackend;
    use std::sync::Mutex;

    /// Replies with a fixed text (or error) and records requests.
    struct ScriptedProvider {
        reply: Result<String, ProviderError>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(reply: Result<String, ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
            let model = request.model.clone();
            self.seen.lock().unwrap().push(request);
            self.reply.clone().map(|content| CompletionResponse {
                content,
                model,
                usage: None,
            })
        }
    }

    /// A store whose appends always fail.
    struct BrokenStore;

    #[async_trait]
    impl ConversationStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }
        async fn append(&self, _: &UserId, _: Role, _: &str) -> Result<(), MemoryError> {
            Err(MemoryError::Storage("disk full".into()))
        }
        async fn recent(&self, _: &UserId, _: usize) -> Result<Vec<ConversationTurn>, MemoryError> {
            Ok(Vec::new())
        }
        async fn count(&self, _: &UserId) -> Result<usize, MemoryError> {
            Ok(0)
        }
    }

    fn roles_and_text(turns: &[ConversationTurn]) -> Vec<(Role, &str)> {
        turns.iter().map(|t| (t.role, t.content.as_str())).collect()
    }

    #[tokio::test]
    async fn successful_exchange_logs_both_turns() {
        let store = Arc::new(InMemoryBackend::new());
        let provider = ScriptedProvider::new(Ok("I'm fine".into()));
        let exchange = Exchange::new(store.clone(), DispatchClient::new(provider.clone()));
        let user = UserId::from("42");

        store.append(&user, Role::User, "hi").await.unwrap();
        store.append(&user, Role::Assistant, "hello").await.unwrap();

        let outcome = exchange.run(&user, "how are you", None).await.unwrap();
        assert_eq!(outcome.reply, "I'm fine");
        assert!(outcome.succeeded);
        assert_eq!(outcome.model, Some(crate::builder::TEXT_MODEL));
        assert_eq!(outcome.state, ExchangeState::Logged);

        let sent = provider.seen.lock().unwrap();
        assert_eq!(sent[0].messages.len(), 3);
        assert_eq!(sent[0].messages[2].text_content(), "how are you");

        let turns = store.recent(&user, 10).await.unwrap();
        assert_eq!(
            roles_and_text(&turns),
            vec![
                (Role::User, "hi"),
                (Role::Assistant, "hello"),
                (Role::User, "how are you"),
                (Role::Assistant, "I'm fine"),
            ]
        );
    }

    #[tokio::test]
    async fn history_limit_bounds_context() {
        let store = Arc::new(InMemoryBackend::new());
        let provider = ScriptedProvider::new(Ok("ok".into()));
        let exchange =
            Exchange::new(store.clone(), DispatchClient::new(provider.clone())).with_history_limit(2);
        let user = UserId::from("42");
        for i in 0..6 {
            store.append(&user, Role::User, &format!("m{i}")).await.unwrap();
        }

        exchange.run(&user, "now", None).await.unwrap();
        let sent = provider.seen.lock().unwrap();
        let texts: Vec<String> = sent[0].messages.iter().map(|m| m.text_content()).collect();
        assert_eq!(texts, vec!["m4", "m5", "now"]);
    }

    #[tokio::test]
    async fn transport_failure_is_logged_as_assistant_turn() {
        let store = Arc::new(InMemoryBackend::new());
        let provider = ScriptedProvider::new(Err(ProviderError::Network("timed out".into())));
        let exchange = Exchange::new(store.clone(), DispatchClient::new(provider));
        let user = UserId::from("42");

        let outcome = exchange.run(&user, "hello?", None).await.unwrap();
        assert!(!outcome.succeeded);
        assert!(outcome.reply.contains("Error communicating"));
        assert!(outcome.reply.contains("timed out"));
        assert_eq!(outcome.state, ExchangeState::Logged);

        let turns = store.recent(&user, 10).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, outcome.reply);
    }

    #[tokio::test]
    async fn disabled_dispatch_replies_with_warning() {
        let store = Arc::new(InMemoryBackend::new());
        let exchange = Exchange::new(store.clone(), DispatchClient::disabled());
        let user = UserId::from("42");

        let outcome = exchange.run(&user, "hi", None).await.unwrap();
        assert_eq!(outcome.reply, MISSING_API_KEY_WARNING);
        assert!(!outcome.succeeded);
        assert_eq!(store.count(&user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn undecodable_image_is_reported_and_logged() {
        let store = Arc::new(InMemoryBackend::new());
        let provider = ScriptedProvider::new(Ok("unused".into()));
        let exchange = Exchange::new(store.clone(), DispatchClient::new(provider.clone()));
        let user = UserId::from("42");

        let outcome = exchange
            .run(&user, "Describe this image", Some(ImagePayload::Encoded(b"garbage".to_vec())))
            .await
            .unwrap();
        assert!(outcome.reply.starts_with("Error processing image"));
        assert!(outcome.model.is_none());
        assert!(provider.seen.lock().unwrap().is_empty());
        assert_eq!(store.count(&user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn storage_failure_aborts_exchange() {
        let provider = ScriptedProvider::new(Ok("answer".into()));
        let exchange = Exchange::new(Arc::new(BrokenStore), DispatchClient::new(provider));
        let err = exchange.run(&UserId::from("42"), "hi", None).await.unwrap_err();
        assert!(matches!(err, MemoryError::Storage(_)));
    }

    #[test]
    fn states_are_ordered() {
        assert!(ExchangeState::Received < ExchangeState::Windowed);
        assert!(ExchangeState::Dispatched < ExchangeState::Logged);
        assert!(ExchangeState::Logged < ExchangeState::Replied);
    }
}
