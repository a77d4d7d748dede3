//! # orderdesk core
//!
//! Domain types, traits, and error definitions for the orderdesk agent.
//! This crate has **no framework dependencies**: it defines the domain model
//! that every other crate implements against.
//!
//! ## Seams
//!
//! - [`Provider`] is the language-model capability (given history + tool
//!   declarations, returns a final answer or tool-call requests).
//! - [`Tool`] is a single executable capability; [`ToolRegistry`] is the
//!   immutable catalogue the agent loop advertises and dispatches against.
//! - [`CheckpointStore`] persists each thread's ordered message history.

pub mod checkpoint;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod schema;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use checkpoint::{Checkpoint, CheckpointStore, Committed};
pub use error::Error;
pub use event::{DomainEvent, EventBus};
pub use message::{Message, Role, ThreadId, ToolCall};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use schema::{InputSchema, ParamKind, ParamSpec};
pub use tool::{Tool, ToolDeclaration, ToolRegistry, ToolResult};
