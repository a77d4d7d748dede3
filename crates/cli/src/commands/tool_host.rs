//! `orderdesk tool-host`: serve the shop tools over stdin/stdout.
//!
//! Spawned by the orchestrator; not meant to be run by hand. Logs go to
//! stderr.

use orderdesk_mcp::ToolServer;
use orderdesk_tools::{ShopStore, shop_registry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::{BoxError, load_config};

pub async fn run(config_path: Option<&Path>, db: Option<PathBuf>) -> Result<(), BoxError> {
    let db = match db {
        Some(db) => db,
        None => load_config(config_path)?.store.database,
    };

    let store = ShopStore::open_read_only(&db).await?;
    let registry = Arc::new(shop_registry(store.clone()));
    info!(db = %db.display(), tools = registry.len(), "Tool host starting");

    ToolServer::new(registry)
        .with_info("shop-server", env!("CARGO_PKG_VERSION"))
        .serve_stdio()
        .await?;

    store.close().await;
    Ok(())
}
