//! Read-only access to the shop database.
//!
//! Two relations, `customers(id, name, email)` and
//! `orders(id, customer_id, product, price, status, order_date)`, queried by
//! point lookups only. The pool is opened read-only; nothing here writes.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::info;

/// Errors from the shop store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open shop database at {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("{0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// An order as the tools present it. `customer_id` is kept for joins in
/// code but not shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub product: String,
    pub status: String,
    pub price: f64,
    pub order_date: String,
    #[serde(skip_serializing, default)]
    pub customer_id: i64,
}

impl Customer {
    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
        })
    }
}

impl Order {
    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.try_get("id")?,
            product: row.try_get("product")?,
            status: row.try_get("status")?,
            price: row.try_get("price")?,
            order_date: row.try_get("order_date")?,
            customer_id: row.try_get("customer_id")?,
        })
    }
}

/// Shared handle to the shop database. Cloning shares the pool.
#[derive(Clone)]
pub struct ShopStore {
    pool: SqlitePool,
}

impl ShopStore {
    /// Open an existing database read-only. A missing file is an error.
    pub async fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Open {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        info!(path = %path.display(), "Shop database opened read-only");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_database_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShopStore::open_read_only(&dir.path().join("absent.db"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Open { .. }));
        assert!(!dir.path().join("absent.db").exists());
    }

    #[tokio::test]
    async fn store_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.db");
        crate::seed::seed_database(&path).await.unwrap();

        let store = ShopStore::open_read_only(&path).await.unwrap();
        let write = sqlx::query("DELETE FROM orders")
            .execute(store.pool())
            .await;
        assert!(write.is_err());
    }

    #[test]
    fn order_json_hides_customer_id() {
        let order = Order {
            id: 1,
            product: "Barbeador".into(),
            status: "IN_TRANSPORT".into(),
            price: 250.0,
            order_date: "2025-12-03".into(),
            customer_id: 1,
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "IN_TRANSPORT");
        assert!(json.get("customer_id").is_none());
    }
}
