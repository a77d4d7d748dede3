//! Append-oriented persistence of thread history.
//!
//! The version of a thread is the number of committed messages. Every append
//! names the version it was computed against, so a writer that lost track of
//! the thread gets a conflict instead of silently interleaving.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CheckpointError;
use crate::message::{Message, ThreadId};

/// The committed state of one thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: ThreadId,

    /// Ordered messages, oldest first
    pub messages: Vec<Message>,

    /// Number of committed messages
    pub version: u64,

    /// When the last append happened
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn empty(thread_id: ThreadId) -> Self {
        Self {
            thread_id,
            messages: Vec::new(),
            version: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Acknowledgement of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committed {
    pub version: u64,
}

/// The core CheckpointStore trait.
///
/// Implementations: in-memory (single process), SQLite (durable).
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// The backend name (e.g., "memory", "sqlite").
    fn name(&self) -> &str;

    /// Load a thread, or `None` if it has never been written.
    async fn load(&self, thread_id: &ThreadId) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Append messages after `expected_version` committed messages.
    ///
    /// Appending to an unseen thread with `expected_version == 0` creates it.
    async fn append(
        &self,
        thread_id: &ThreadId,
        expected_version: u64,
        messages: &[Message],
    ) -> Result<Committed, CheckpointError>;

    /// List the ids of all known threads.
    async fn list_threads(&self) -> Result<Vec<ThreadId>, CheckpointError>;

    /// Load a thread, creating an empty checkpoint for unseen ids.
    async fn load_or_empty(&self, thread_id: &ThreadId) -> Result<Checkpoint, CheckpointError> {
        Ok(self
            .load(thread_id)
            .await?
            .unwrap_or_else(|| Checkpoint::empty(thread_id.clone())))
    }
}
