//! In-memory backend — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use relaybot_core::error::MemoryError;
use relaybot_core::memory::ConversationStore;
use relaybot_core::message::{ConversationTurn, Role, UserId};
use relaybot_core::task::{NewTask, Task, TaskStore};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    turns: Vec<ConversationTurn>,
    tasks: Vec<Task>,
    next_turn_id: i64,
    next_task_id: i64,
}

/// Conversation and task store kept in a Vec behind a lock.
/// Nothing survives a restart.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<RwLock<State>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(&self, user_id: &UserId, role: Role, content: &str) -> Result<(), MemoryError> {
        let mut state = self.state.write().await;
        state.next_turn_id += 1;
        let id = state.next_turn_id;
        state.turns.push(ConversationTurn {
            id,
            user_id: user_id.clone(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn recent(&self, user_id: &UserId, limit: usize) -> Result<Vec<ConversationTurn>, MemoryError> {
        let state = self.state.read().await;
        let mut turns: Vec<ConversationTurn> = state
            .turns
            .iter()
            .rev()
            .filter(|t| &t.user_id == user_id)
            .take(limit)
            .cloned()
            .collect();
        turns.reverse();
        Ok(turns)
    }

    async fn count(&self, user_id: &UserId) -> Result<usize, MemoryError> {
        let state = self.state.read().await;
        Ok(state.turns.iter().filter(|t| &t.user_id == user_id).count())
    }
}

#[async_trait]
impl TaskStore for InMemoryBackend {
    async fn add(&self, user_id: &UserId, task: NewTask) -> Result<i64, MemoryError> {
        let mut state = self.state.write().await;
        state.next_task_id += 1;
        let id = state.next_task_id;
        state.tasks.push(Task {
            id,
            user_id: user_id.clone(),
            title: task.title,
            description: task.description,
            due_date: task.due_date,
            is_completed: false,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list(&self, user_id: &UserId, pending_only: bool) -> Result<Vec<Task>, MemoryError> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .iter()
            .filter(|t| &t.user_id == user_id && !(pending_only && t.is_completed))
            .cloned()
            .collect())
    }

    async fn complete(&self, id: i64, user_id: &UserId) -> Result<bool, MemoryError> {
        let mut state = self.state.write().await;
        match state
            .tasks
            .iter_mut()
            .find(|t| t.id == id && &t.user_id == user_id)
        {
            Some(task) => {
                task.is_completed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
