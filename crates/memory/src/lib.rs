//! Storage implementations for relaybot.
//!
//! Both backends implement `ConversationStore` and `TaskStore`.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "sqlite")]
pub mod tasks;

pub use in_memory::InMemoryBackend;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
