use crate::store::{Order, ShopStore, StoreError};

const ORDER_COLUMNS: &str = "id, customer_id, product, price, status, order_date";

#[derive(Clone)]
pub struct OrderService {
    store: ShopStore,
}

impl OrderService {
    pub fn new(store: ShopStore) -> Self {
        Self { store }
    }

    /// `None` when no order has this id.
    pub async fn get_order_by_id(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.store.pool())
            .await?;
        row.as_ref().map(Order::from_row).transpose()
    }

    /// All orders of one customer, by order id.
    pub async fn list_orders_for_customer(&self, customer_id: i64) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ? ORDER BY id"
        ))
        .bind(customer_id)
        .fetch_all(self.store.pool())
        .await?;
        rows.iter().map(Order::from_row).collect()
    }
}
