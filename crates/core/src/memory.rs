//! Conversation store trait — the append-only log of turns.
//!
//! The store is the only shared mutable state between exchanges. It must
//! accept concurrent appends from many users without breaking per-user
//! ordering; readers only ever see a bounded window of the newest turns.

use async_trait::async_trait;
use crate::error::MemoryError;
use crate::message::{ConversationTurn, ConversationWindow, Role, UserId};

/// Default number of turns retrieved as context.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// The core ConversationStore trait.
///
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Durably record one turn. Turns are never mutated or deleted afterwards.
    async fn append(
        &self,
        user_id: &UserId,
        role: Role,
        content: &str,
    ) -> std::result::Result<(), MemoryError>;

    /// Up to `limit` most recent turns for `user_id`, oldest first.
    ///
    /// An unknown user yields an empty vector, not an error.
    async fn recent(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> std::result::Result<Vec<ConversationTurn>, MemoryError>;

    /// Total number of turns stored for `user_id`.
    async fn count(&self, user_id: &UserId) -> std::result::Result<usize, MemoryError>;

    /// The context window for a new request.
    async fn window(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> std::result::Result<ConversationWindow, MemoryError> {
        let turns = self.recent(user_id, limit).await?;
        Ok(ConversationWindow::from_turns(&turns))
    }
}
