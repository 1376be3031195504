//! SQLite backend.
//!
//! Uses a single SQLite database file with two tables:
//! - `conversations` — the append-only turn log
//! - `tasks` — per-user to-do records (see [`crate::tasks`])
//!
//! Turn ordering is `created_at` with the autoincrement `id` as tie-breaker.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use relaybot_core::error::MemoryError;
use relaybot_core::memory::ConversationStore;
use relaybot_core::message::{ConversationTurn, Role, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// A production SQLite backend for conversations and tasks.
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let backend = Self { pool };
        backend.run_migrations().await?;
        info!("SQLite backend initialized at {path}");
        Ok(backend)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let backend = Self { pool };
        backend.run_migrations().await?;
        Ok(backend)
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet.
    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL,
                role        TEXT NOT NULL,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("conversations table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id, id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("conversations index: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id       TEXT NOT NULL,
                title         TEXT NOT NULL,
                description   TEXT,
                due_date      TEXT,
                is_completed  INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("tasks table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id, id)")
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::MigrationFailed(format!("tasks index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse a `ConversationTurn` from a SQLite row.
    fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> Result<ConversationTurn, MemoryError> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| MemoryError::QueryFailed(format!("id column: {e}")))?;
        let user_id: String = row
            .try_get("user_id")
            .map_err(|e| MemoryError::QueryFailed(format!("user_id column: {e}")))?;
        let role: String = row
            .try_get("role")
            .map_err(|e| MemoryError::QueryFailed(format!("role column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| MemoryError::QueryFailed(format!("content column: {e}")))?;
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| MemoryError::QueryFailed(format!("created_at column: {e}")))?;

        let role = Role::from_str(&role).map_err(MemoryError::QueryFailed)?;
        let created_at = parse_timestamp(&created_at);

        Ok(ConversationTurn {
            id,
            user_id: UserId::new(user_id),
            role,
            content,
            created_at,
        })
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
pub(crate) fn format_timestamp(ts: chrono::DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl ConversationStore for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append(&self, user_id: &UserId, role: Role, content: &str) -> Result<(), MemoryError> {
        sqlx::query(
            "INSERT INTO conversations (user_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id.as_str())
        .bind(role.as_str())
        .bind(content)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("Append failed: {e}")))?;

        debug!(user = %user_id, %role, "Turn appended");
        Ok(())
    }

    async fn recent(&self, user_id: &UserId, limit: usize) -> Result<Vec<ConversationTurn>, MemoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, role, content, created_at
            FROM conversations
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("Recent turns query failed: {e}")))?;

        let mut turns: Vec<ConversationTurn> = rows
            .iter()
            .filter_map(|row| match Self::row_to_turn(row) {
                Ok(turn) => Some(turn),
                Err(e) => {
                    warn!(user = %user_id, error = %e, "Skipping unreadable turn");
                    None
                }
            })
            .collect();

        // Newest-first from the query; callers want chronological order.
        turns.reverse();
        Ok(turns)
    }

    async fn count(&self, user_id: &UserId) -> Result<usize, MemoryError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM conversations WHERE user_id = ?")
            .bind(user_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("Count failed: {e}")))?;

        let count: i64 = row.try_get("cnt").unwrap_or(0);
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
