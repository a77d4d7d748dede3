//! In-memory checkpoint store: single process, lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use orderdesk_core::checkpoint::{Checkpoint, CheckpointStore, Committed};
use orderdesk_core::error::CheckpointError;
use orderdesk_core::message::{Message, ThreadId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps every thread in a map guarded by one lock.
pub struct InMemoryCheckpointStore {
    threads: Arc<RwLock<HashMap<ThreadId, Checkpoint>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, thread_id: &ThreadId) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn append(
        &self,
        thread_id: &ThreadId,
        expected_version: u64,
        messages: &[Message],
    ) -> Result<Committed, CheckpointError> {
        let mut threads = self.threads.write().await;
        let actual = threads.get(thread_id).map_or(0, |cp| cp.version);
        if actual != expected_version {
            return Err(CheckpointError::Conflict {
                thread_id: thread_id.to_string(),
                expected: expected_version,
                actual,
            });
        }

        let checkpoint = threads
            .entry(thread_id.clone())
            .or_insert_with(|| Checkpoint::empty(thread_id.clone()));

        checkpoint.messages.extend_from_slice(messages);
        checkpoint.version = checkpoint.messages.len() as u64;
        checkpoint.updated_at = Utc::now();

        Ok(Committed {
            version: checkpoint.version,
        })
    }

    async fn list_threads(&self) -> Result<Vec<ThreadId>, CheckpointError> {
        let mut ids: Vec<ThreadId> = self.threads.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unseen_thread_loads_as_none() {
        let store = InMemoryCheckpointStore::new();
        assert!(store.load(&ThreadId::from("t1")).await.unwrap().is_none());
        let empty = store.load_or_empty(&ThreadId::from("t1")).await.unwrap();
        assert_eq!(empty.version, 0);
    }

    #[tokio::test]
    async fn append_then_load() {
        let store = InMemoryCheckpointStore::new();
        let id = ThreadId::from("t1");

        let c = store
            .append(&id, 0, &[Message::user("q"), Message::assistant("a")])
            .await
            .unwrap();
        assert_eq!(c.version, 2);

        let cp = store.load(&id).await.unwrap().unwrap();
        assert_eq!(cp.version, 2);
        assert_eq!(cp.messages[0].text(), "q");
        assert_eq!(cp.messages[1].text(), "a");
    }

    #[tokio::test]
    async fn stale_version_conflicts() {
        let store = InMemoryCheckpointStore::new();
        let id = ThreadId::from("t1");
        store.append(&id, 0, &[Message::user("q")]).await.unwrap();

        let err = store
            .append(&id, 0, &[Message::user("other")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::Conflict { expected: 0, actual: 1, .. }
        ));
        assert_eq!(store.load(&id).await.unwrap().unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn threads_are_isolated() {
        let store = InMemoryCheckpointStore::new();
        store
            .append(&ThreadId::from("b"), 0, &[Message::user("for b")])
            .await
            .unwrap();
        store
            .append(&ThreadId::from("a"), 0, &[Message::user("for a")])
            .await
            .unwrap();

        let a = store.load(&ThreadId::from("a")).await.unwrap().unwrap();
        assert_eq!(a.messages.len(), 1);
        assert_eq!(a.messages[0].text(), "for a");
        assert_eq!(
            store.list_threads().await.unwrap(),
            vec![ThreadId::from("a"), ThreadId::from("b")]
        );
    }
}
