//! SQLite checkpoint store.
//!
//! Uses a single SQLite database file with two tables:
//! - `threads` holds one row per thread with its committed version
//! - `thread_messages` holds the serialized messages, keyed by `(thread_id, seq)`
//!
//! The composite primary key means two writers racing on the same version
//! cannot both commit: the loser hits a unique violation and gets a conflict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderdesk_core::checkpoint::{Checkpoint, CheckpointStore, Committed};
use orderdesk_core::error::CheckpointError;
use orderdesk_core::message::{Message, ThreadId};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A durable checkpoint store backed by SQLite.
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    /// Open (or create) a store at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database.
    pub async fn new(path: &str) -> Result<Self, CheckpointError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| CheckpointError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Every connection to :memory: is its own database
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| CheckpointError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite checkpoint store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), CheckpointError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS threads (
                thread_id   TEXT PRIMARY KEY NOT NULL,
                version     INTEGER NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::Storage(format!("threads table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS thread_messages (
                thread_id   TEXT NOT NULL,
                seq         INTEGER NOT NULL,
                message     TEXT NOT NULL,
                PRIMARY KEY (thread_id, seq)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::Storage(format!("thread_messages table: {e}")))?;

        debug!("SQLite checkpoint migrations complete");
        Ok(())
    }

    fn conflict(thread_id: &ThreadId, expected: u64, actual: u64) -> CheckpointError {
        CheckpointError::Conflict {
            thread_id: thread_id.to_string(),
            expected,
            actual,
        }
    }

    async fn current_version(&self, thread_id: &ThreadId) -> Result<u64, CheckpointError> {
        let row = sqlx::query("SELECT version FROM threads WHERE thread_id = ?")
            .bind(thread_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(format!("read version: {e}")))?;
        match row {
            Some(row) => {
                let v: i64 = row
                    .try_get("version")
                    .map_err(|e| CheckpointError::Corrupt(format!("version column: {e}")))?;
                Ok(v as u64)
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self, thread_id: &ThreadId) -> Result<Option<Checkpoint>, CheckpointError> {
        let Some(head) = sqlx::query("SELECT version, updated_at FROM threads WHERE thread_id = ?")
            .bind(thread_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(format!("load thread: {e}")))?
        else {
            return Ok(None);
        };

        let version: i64 = head
            .try_get("version")
            .map_err(|e| CheckpointError::Corrupt(format!("version column: {e}")))?;
        let updated_at: String = head
            .try_get("updated_at")
            .map_err(|e| CheckpointError::Corrupt(format!("updated_at column: {e}")))?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CheckpointError::Corrupt(format!("updated_at: {e}")))?;

        let rows =
            sqlx::query("SELECT message FROM thread_messages WHERE thread_id = ? ORDER BY seq")
                .bind(thread_id.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| CheckpointError::Storage(format!("load messages: {e}")))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let json: String = row
                .try_get("message")
                .map_err(|e| CheckpointError::Corrupt(format!("message column: {e}")))?;
            let msg: Message = serde_json::from_str(&json)
                .map_err(|e| CheckpointError::Corrupt(format!("message json: {e}")))?;
            messages.push(msg);
        }

        if messages.len() as i64 != version {
            return Err(CheckpointError::Corrupt(format!(
                "thread {thread_id} has version {version} but {} messages",
                messages.len()
            )));
        }

        Ok(Some(Checkpoint {
            thread_id: thread_id.clone(),
            messages,
            version: version as u64,
            updated_at,
        }))
    }

    async fn append(
        &self,
        thread_id: &ThreadId,
        expected_version: u64,
        messages: &[Message],
    ) -> Result<Committed, CheckpointError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CheckpointError::Storage(format!("begin: {e}")))?;

        let actual = match sqlx::query("SELECT version FROM threads WHERE thread_id = ?")
            .bind(thread_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| CheckpointError::Storage(format!("read version: {e}")))?
        {
            Some(row) => row
                .try_get::<i64, _>("version")
                .map_err(|e| CheckpointError::Corrupt(format!("version column: {e}")))?
                as u64,
            None => 0,
        };

        if actual != expected_version {
            return Err(Self::conflict(thread_id, expected_version, actual));
        }

        for (offset, msg) in messages.iter().enumerate() {
            let json = serde_json::to_string(msg)
                .map_err(|e| CheckpointError::Storage(format!("serialize message: {e}")))?;
            let inserted = sqlx::query(
                "INSERT INTO thread_messages (thread_id, seq, message) VALUES (?, ?, ?)",
            )
            .bind(thread_id.as_str())
            .bind((expected_version + offset as u64) as i64)
            .bind(json)
            .execute(&mut *tx)
            .await;

            if let Err(e) = inserted {
                let unique = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
                drop(tx);
                if unique {
                    let actual = self.current_version(thread_id).await?;
                    return Err(Self::conflict(thread_id, expected_version, actual));
                }
                return Err(CheckpointError::Storage(format!("insert message: {e}")));
            }
        }

        let version = expected_version + messages.len() as u64;
        sqlx::query(
            r#"
            INSERT INTO threads (thread_id, version, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(thread_id) DO UPDATE SET
                version = excluded.version,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(thread_id.as_str())
        .bind(version as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| CheckpointError::Storage(format!("update thread: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| CheckpointError::Storage(format!("commit: {e}")))?;

        debug!(thread_id = %thread_id, version, "Checkpoint committed");
        Ok(Committed { version })
    }

    async fn list_threads(&self) -> Result<Vec<ThreadId>, CheckpointError> {
        let rows = sqlx::query("SELECT thread_id FROM threads ORDER BY thread_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(format!("list threads: {e}")))?;
        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("thread_id")
                    .map(ThreadId)
                    .map_err(|e| CheckpointError::Corrupt(format!("thread_id column: {e}")))
            })
            .collect()
    }
}
