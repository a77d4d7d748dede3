//! Recreates the shop database with its fixed sample data.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

use crate::store::StoreError;

const CUSTOMERS: &[(i64, &str, &str)] = &[
    (1, "Pedro Henrique", "pedro@email.com"),
    (2, "Paulo Silva", "paulo@email.com"),
    (3, "Felipe dos Santos", "felipe@email.com"),
    (4, "Luiza Pereira", "luiza@email.com"),
    (5, "Juliana Marques", "juliana@email.com"),
];

// (id, customer_id, product, price, status, order_date)
const ORDERS: &[(i64, i64, &str, f64, &str, &str)] = &[
    (1, 1, "Barbeador", 250.00, "IN_TRANSPORT", "2025-12-03"),
    (2, 1, "Notebook", 3000.00, "DELIVERED", "2025-11-24"),
    (3, 2, "Bola de futebol", 54.50, "IN_TRANSPORT", "2025-12-10"),
    (4, 3, "Camiseta", 120.00, "IN_TRANSPORT", "2025-12-04"),
    (5, 4, "Salto", 340.00, "DELIVERED", "2025-11-29"),
    (6, 4, "Batom", 60.00, "DELAYED", "2025-11-02"),
    (7, 5, "Bolsa", 700.90, "IN_TRANSPORT", "2025-12-05"),
];

/// What a seed run wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub customers: usize,
    pub orders: usize,
}

/// Delete any database at `path` and write a fresh one.
pub async fn seed_database(path: &Path) -> Result<SeedSummary, StoreError> {
    if path.exists() {
        info!(path = %path.display(), "Removing old database");
        std::fs::remove_file(path).map_err(|e| StoreError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| StoreError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            id     INTEGER PRIMARY KEY AUTOINCREMENT,
            name   TEXT NOT NULL,
            email  TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id  INTEGER NOT NULL,
            product      TEXT NOT NULL,
            price        REAL NOT NULL,
            status       TEXT NOT NULL,
            order_date   TEXT NOT NULL,
            FOREIGN KEY(customer_id) REFERENCES customers(id)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    for (id, name, email) in CUSTOMERS {
        sqlx::query("INSERT INTO customers (id, name, email) VALUES (?, ?, ?)")
            .bind(*id)
            .bind(*name)
            .bind(*email)
            .execute(&mut *tx)
            .await?;
    }

    for (id, customer_id, product, price, status, order_date) in ORDERS {
        sqlx::query(
            "INSERT INTO orders (id, customer_id, product, price, status, order_date) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(*id)
        .bind(*customer_id)
        .bind(*product)
        .bind(*price)
        .bind(*status)
        .bind(*order_date)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    pool.close().await;

    info!(path = %path.display(), "Shop database created");
    Ok(SeedSummary {
        customers: CUSTOMERS.len(),
        orders: ORDERS.len(),
    })
}
