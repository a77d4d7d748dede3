//! Shop tools for orderdesk.
//!
//! These run inside the tool host process: a read-only [`ShopStore`], the
//! service modules that query it, and the two tools the agent may call.
//! [`seed::seed_database`] writes the sample database the tools read.

pub mod consult_order_status;
pub mod list_customer_orders;
pub mod seed;
pub mod services;
pub mod store;

use orderdesk_core::error::ToolError;
use orderdesk_core::schema::as_whole_i64;
use orderdesk_core::tool::ToolRegistry;

pub use consult_order_status::ConsultOrderStatusTool;
pub use list_customer_orders::ListCustomerOrdersTool;
pub use seed::{SeedSummary, seed_database};
pub use services::{CustomerService, OrderService};
pub use store::{Customer, Order, ShopStore, StoreError};

/// Build the registry of shop tools over one store.
pub fn shop_registry(store: ShopStore) -> ToolRegistry {
    let orders = OrderService::new(store.clone());
    let customers = CustomerService::new(store);

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ConsultOrderStatusTool::new(orders.clone())));
    registry.register(Box::new(ListCustomerOrdersTool::new(customers, orders)));
    registry
}

/// Read an integer argument, accepting `3.0` as well as `3`.
pub(crate) fn integer_arg(arguments: &serde_json::Value, name: &str) -> Result<i64, ToolError> {
    as_whole_i64(&arguments[name])
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{name}' must be a 64-bit integer")))
}
