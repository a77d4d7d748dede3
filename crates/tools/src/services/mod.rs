//! Data-access services over the shop store.
//!
//! Tools go through these rather than issuing SQL themselves, so every
//! lookup shares one error path.

pub mod customers;
pub mod orders;

pub use customers::CustomerService;
pub use orders::OrderService;
