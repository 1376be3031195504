//! Task store trait — simple per-user to-do records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;
use crate::message::UserId;

/// A task or reminder owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub user_id: UserId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form due date as entered by the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Keyed CRUD over tasks.
///
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a task and return its id.
    async fn add(&self, user_id: &UserId, task: NewTask) -> std::result::Result<i64, MemoryError>;

    /// Tasks of `user_id` in creation order; only open ones when `pending_only`.
    async fn list(
        &self,
        user_id: &UserId,
        pending_only: bool,
    ) -> std::result::Result<Vec<Task>, MemoryError>;

    /// Mark a task done. Returns false when no task of this user has that id.
    async fn complete(&self, id: i64, user_id: &UserId) -> std::result::Result<bool, MemoryError>;
}
