//! Classifiable error kinds for a single MCP client/transport pair.

use mcp_types::JSONRPCErrorError;

use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to spawn server: {0}")]
    SpawnFailed(#[from] TransportError),
    #[error("transport closed unexpectedly")]
    TransportClosed,
    #[error("malformed frame: {0}")]
    DecodeError(#[from] mcp_types::DecodeError),
    #[error("server returned JSON-RPC error {code}: {message}", code = .0.code, message = .0.message)]
    ProtocolError(JSONRPCErrorError),
    #[error("request timed out")]
    Timeout,
    #[error("client is shutting down")]
    ShuttingDown,
    #[error("failed to serialize/deserialize message: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("client is not Running (state = {0:?})")]
    NotRunning(crate::mcp_client::ClientStatus),
}
