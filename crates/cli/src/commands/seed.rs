//! `orderdesk seed`: recreate the shop database.

use orderdesk_tools::seed_database;
use std::path::{Path, PathBuf};

use super::{BoxError, load_config};

pub async fn run(config_path: Option<&Path>, db: Option<PathBuf>) -> Result<(), BoxError> {
    let db = match db {
        Some(db) => db,
        None => load_config(config_path)?.store.database,
    };

    let summary = seed_database(&db).await?;
    println!(
        "  ✅ {} created with {} customers and {} orders",
        db.display(),
        summary.customers,
        summary.orders
    );
    Ok(())
}
