//! Language model provider implementations for orderdesk.
//!
//! All providers implement the `orderdesk_core::Provider` trait.
//! [`build_from_config`] selects the backend named in configuration.

pub mod anthropic;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use router::build_from_config;
