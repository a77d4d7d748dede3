//! Tool host transport for orderdesk.
//!
//! The tool host is a separate process that owns the shop database. The
//! orchestrator spawns it, speaks newline-delimited JSON-RPC 2.0 to it over
//! stdio, and sees its tools as ordinary [`Tool`](orderdesk_core::Tool)s
//! through [`RemoteTool`] proxies.
//!
//! - [`protocol`]: wire types
//! - [`Connection`]: id-correlated requests over one byte stream
//! - [`ToolHost`]: lifecycle, discovery, restart
//! - [`ToolServer`]: the host side, serving a registry

pub mod connection;
pub mod host;
pub mod protocol;
pub mod remote_tool;
pub mod server;

pub use connection::Connection;
pub use host::{Connected, Connector, HostOptions, ProcessConnector, ToolHost};
pub use protocol::{CallToolResult, PROTOCOL_VERSION};
pub use remote_tool::RemoteTool;
pub use server::ToolServer;
