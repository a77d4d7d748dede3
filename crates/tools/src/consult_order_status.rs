//! `consult_order_status`: look up one order by id.

use async_trait::async_trait;
use orderdesk_core::error::{ToolError, ToolErrorKind};
use orderdesk_core::schema::{InputSchema, ParamKind};
use orderdesk_core::tool::{Tool, ToolResult};
use tracing::warn;

use crate::integer_arg;
use crate::services::OrderService;

pub struct ConsultOrderStatusTool {
    orders: OrderService,
}

impl ConsultOrderStatusTool {
    pub fn new(orders: OrderService) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl Tool for ConsultOrderStatusTool {
    fn name(&self) -> &str {
        "consult_order_status"
    }

    fn description(&self) -> &str {
        "Look up the status of an order. Returns the product, status, price and order date."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new().required(
            "order_id",
            ParamKind::Integer,
            "Number that identifies the order (example: 1, 2, 38, 57)",
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let order_id = integer_arg(&arguments, "order_id")?;

        match self.orders.get_order_by_id(order_id).await {
            Ok(Some(order)) => {
                let output = serde_json::to_string_pretty(&order).unwrap_or_default();
                let data = serde_json::to_value(&order).unwrap_or_default();
                Ok(ToolResult::success(output).with_data(data))
            }
            Ok(None) => Ok(ToolResult::success(format!("Order {order_id} not found"))),
            Err(e) => {
                warn!(order_id, error = %e, "Order lookup failed");
                Ok(ToolResult::error(
                    ToolErrorKind::Execution,
                    format!("Error on processing: {e}"),
                ))
            }
        }
    }
}
