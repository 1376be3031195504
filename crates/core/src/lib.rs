//! # relaybot core
//!
//! Domain types, traits, and error definitions for the relaybot assistant.
//! This crate has no transport or storage dependencies: it defines the model
//! that the other crates implement against.
//!
//! Every collaborator of the dispatch path (model backend, conversation
//! store, task store, messaging channel, read-only integration) is a trait
//! here, so each can be swapped for a test double.

pub mod error;
pub mod message;
pub mod provider;
pub mod memory;
pub mod task;
pub mod channel;
pub mod integration;

// Re-export key types at crate root for ergonomics
pub use error::{DispatchError, EncodingError, Error, Result, MISSING_API_KEY_WARNING};
pub use message::{
    ConversationTurn, ConversationWindow, HistoryEntry, MessageContent, RequestMessage, Role,
    UserId,
};
pub use provider::{CompletionRequest, CompletionResponse, GenerationParams, Provider};
pub use memory::ConversationStore;
pub use task::{NewTask, Task, TaskStore};
pub use channel::{AudioClip, Channel, ChannelId, InboundEvent, Reply};
pub use integration::{Integration, IntegrationRegistry};
