//! Task store on top of the SQLite backend.

use async_trait::async_trait;
use chrono::Utc;
use relaybot_core::error::MemoryError;
use relaybot_core::message::UserId;
use relaybot_core::task::{NewTask, Task, TaskStore};
use sqlx::Row;
use tracing::debug;

use crate::sqlite::{format_timestamp, parse_timestamp, SqliteBackend};

fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task, MemoryError> {
    let column = |name: &str, e: sqlx::Error| MemoryError::QueryFailed(format!("{name} column: {e}"));

    let id: i64 = row.try_get("id").map_err(|e| column("id", e))?;
    let user_id: String = row.try_get("user_id").map_err(|e| column("user_id", e))?;
    let title: String = row.try_get("title").map_err(|e| column("title", e))?;
    let description: Option<String> = row
        .try_get("description")
        .map_err(|e| column("description", e))?;
    let due_date: Option<String> = row.try_get("due_date").map_err(|e| column("due_date", e))?;
    let is_completed: bool = row
        .try_get("is_completed")
        .map_err(|e| column("is_completed", e))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| column("created_at", e))?;

    Ok(Task {
        id,
        user_id: UserId::new(user_id),
        title,
        description,
        due_date,
        is_completed,
        created_at: parse_timestamp(&created_at),
    })
}

#[async_trait]
impl TaskStore for SqliteBackend {
    async fn add(&self, user_id: &UserId, task: NewTask) -> Result<i64, MemoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO tasks (user_id, title, description, due_date, is_completed, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(user_id.as_str())
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.due_date)
        .bind(format_timestamp(Utc::now()))
        .execute(self.pool())
        .await
        .map_err(|e| MemoryError::Storage(format!("Task insert failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(user = %user_id, task_id = id, "Task added");
        Ok(id)
    }

    async fn list(&self, user_id: &UserId, pending_only: bool) -> Result<Vec<Task>, MemoryError> {
        let sql = if pending_only {
            "SELECT * FROM tasks WHERE user_id = ? AND is_completed = 0 ORDER BY id"
        } else {
            "SELECT * FROM tasks WHERE user_id = ? ORDER BY id"
        };

        let rows = sqlx::query(sql)
            .bind(user_id.as_str())
            .fetch_all(self.pool())
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("Task list failed: {e}")))?;

        rows.iter().map(row_to_task).collect()
    }

    async fn complete(&self, id: i64, user_id: &UserId) -> Result<bool, MemoryError> {
        let result = sqlx::query("UPDATE tasks SET is_completed = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id.as_str())
            .execute(self.pool())
            .await
            .map_err(|e| MemoryError::Storage(format!("Task update failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
