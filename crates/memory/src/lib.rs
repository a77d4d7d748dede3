//! Checkpoint store implementations for orderdesk.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use orderdesk_config::CheckpointConfig;
use orderdesk_core::checkpoint::CheckpointStore;
use orderdesk_core::error::CheckpointError;

pub use in_memory::InMemoryCheckpointStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCheckpointStore;

/// Open the checkpoint backend named in configuration.
pub async fn build_from_config(
    config: &CheckpointConfig,
) -> Result<Arc<dyn CheckpointStore>, CheckpointError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryCheckpointStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = config.resolved_path();
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        CheckpointError::Storage(format!(
                            "cannot create {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
            }
            let store = SqliteCheckpointStore::new(&path.to_string_lossy()).await?;
            Ok(Arc::new(store))
        }
        other => Err(CheckpointError::Storage(format!(
            "checkpoint backend '{other}' is not available"
        ))),
    }
}
