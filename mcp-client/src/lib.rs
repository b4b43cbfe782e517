//! An async client for one Model Context Protocol (MCP) server reachable
//! over stdio.
//!
//! This crate owns exactly one server's subprocess lifecycle, handshake,
//! and request/response correlation. Fleet-level concerns — multiple
//! servers, fan-out with per-server timeouts, config reconciliation — live
//! one layer up, in the tool registry crate that consumes this one.

mod error;
mod mcp_client;
mod transport;

pub use error::ClientError;
pub use mcp_client::ClientStatus;
pub use mcp_client::DEFAULT_CALL_TOOL_TIMEOUT;
pub use mcp_client::DEFAULT_INITIALIZE_TIMEOUT;
pub use mcp_client::DEFAULT_LIST_TOOLS_TIMEOUT;
pub use mcp_client::McpClient;
pub use transport::SHUTDOWN_GRACE_PERIOD;
pub use transport::StdioTransport;
pub use transport::TransportError;
