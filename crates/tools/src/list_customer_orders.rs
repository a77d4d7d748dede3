//! `list_all_customer_orders`: every order of one customer.

use async_trait::async_trait;
use orderdesk_core::error::{ToolError, ToolErrorKind};
use orderdesk_core::schema::{InputSchema, ParamKind};
use orderdesk_core::tool::{Tool, ToolResult};
use tracing::warn;

use crate::integer_arg;
use crate::services::{CustomerService, OrderService};
use crate::store::{Order, StoreError};

pub struct ListCustomerOrdersTool {
    customers: CustomerService,
    orders: OrderService,
}

impl ListCustomerOrdersTool {
    pub fn new(customers: CustomerService, orders: OrderService) -> Self {
        Self { customers, orders }
    }

    async fn lookup(&self, customer_id: i64) -> Result<Option<Vec<Order>>, StoreError> {
        if self.customers.get_customer_by_id(customer_id).await?.is_none() {
            return Ok(None);
        }
        self.orders.list_orders_for_customer(customer_id).await.map(Some)
    }
}

#[async_trait]
impl Tool for ListCustomerOrdersTool {
    fn name(&self) -> &str {
        "list_all_customer_orders"
    }

    fn description(&self) -> &str {
        "List every order placed by a customer, identified by customer id."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new().required(
            "customer_id",
            ParamKind::Integer,
            "Number that identifies the customer (example: 1, 2, 38, 57)",
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let customer_id = integer_arg(&arguments, "customer_id")?;

        match self.lookup(customer_id).await {
            Ok(Some(orders)) => {
                let output = serde_json::to_string_pretty(&orders).unwrap_or_default();
                let data = serde_json::to_value(&orders).unwrap_or_default();
                Ok(ToolResult::success(output).with_data(data))
            }
            Ok(None) => Ok(ToolResult::success(format!(
                "Customer {customer_id} not found"
            ))),
            Err(e) => {
                warn!(customer_id, error = %e, "Customer order lookup failed");
                Ok(ToolResult::error(
                    ToolErrorKind::Execution,
                    format!("Error on processing: {e}"),
                ))
            }
        }
    }
}
