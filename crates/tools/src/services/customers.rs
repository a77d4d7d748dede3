use crate::store::{Customer, ShopStore, StoreError};

#[derive(Clone)]
pub struct CustomerService {
    store: ShopStore,
}

impl CustomerService {
    pub fn new(store: ShopStore) -> Self {
        Self { store }
    }

    pub async fn get_customer_by_id(&self, id: i64) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query("SELECT id, name, email FROM customers WHERE id = ?")
            .bind(id)
            .fetch_optional(self.store.pool())
            .await?;
        row.as_ref().map(Customer::from_row).transpose()
    }
}
