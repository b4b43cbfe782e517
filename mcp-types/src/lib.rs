//! Wire types for the Model Context Protocol (MCP): JSON-RPC 2.0 framing
//! plus the `initialize` / `tools/list` / `tools/call` request catalogue.
//!
//! This crate has no I/O of its own — it only defines the shapes that
//! `mcp-client` encodes and decodes over a child process's stdio.

mod protocol;
mod requests;
mod tool;

pub use protocol::DecodeError;
pub use protocol::JSONRPCError;
pub use protocol::JSONRPCErrorError;
pub use protocol::JSONRPCMessage;
pub use protocol::JSONRPCNotification;
pub use protocol::JSONRPCRequest;
pub use protocol::JSONRPCResponse;
pub use protocol::JSONRPC_VERSION;
pub use protocol::RequestId;
pub use protocol::decode;
pub use protocol::encode;

pub use requests::CallToolRequest;
pub use requests::CallToolRequestParams;
pub use requests::ClientCapabilities;
pub use requests::Implementation;
pub use requests::InitializeRequest;
pub use requests::InitializeRequestParams;
pub use requests::InitializeResult;
pub use requests::InitializedNotification;
pub use requests::ListToolsRequest;
pub use requests::ListToolsRequestParams;
pub use requests::ListToolsResult;
pub use requests::ModelContextProtocolNotification;
pub use requests::ModelContextProtocolRequest;
pub use requests::PROTOCOL_VERSION;
pub use requests::ServerCapabilities;
pub use requests::ToolListChangedNotification;

pub use tool::CallToolResult;
pub use tool::ContentBlock;
pub use tool::Tool;
