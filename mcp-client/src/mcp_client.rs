//! Per-server MCP client: handshake, request/response correlation, tool
//! cache, and notification handling on top of [`StdioTransport`].
//!
//! The pending-request discipline (register the oneshot slot *before*
//! sending, so a response that arrives before the send future even polls
//! can't be lost) follows the same shape as a conventional JSON-RPC stdio
//! client: one writer task, one reader task, a map from id to a one-shot
//! result slot.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use mcp_types::CallToolRequest;
use mcp_types::CallToolRequestParams;
use mcp_types::CallToolResult;
use mcp_types::ClientCapabilities;
use mcp_types::Implementation;
use mcp_types::InitializeRequest;
use mcp_types::InitializeRequestParams;
use mcp_types::InitializedNotification;
use mcp_types::JSONRPCErrorError;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCNotification;
use mcp_types::JSONRPCRequest;
use mcp_types::JSONRPC_VERSION;
use mcp_types::ListToolsRequest;
use mcp_types::ListToolsRequestParams;
use mcp_types::ModelContextProtocolNotification;
use mcp_types::ModelContextProtocolRequest;
use mcp_types::PROTOCOL_VERSION;
use mcp_types::RequestId;
use mcp_types::Tool;
use mcp_types::ToolListChangedNotification;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::error::ClientError;
use crate::transport::StdioTransport;

pub const DEFAULT_INITIALIZE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_LIST_TOOLS_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CALL_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle state of one [`McpClient`].
///
/// Transitions are monotonic within a lifetime: a client that reaches
/// `Stopped` or `Error` is never moved back to `Starting`/`Running` — a new
/// `McpClient` is constructed instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    Stopped,
    Starting,
    Running,
    Error,
}

type PendingSender = oneshot::Sender<Result<JSONRPCMessage, ClientError>>;

/// The pending-request table: one single-shot slot per outstanding id.
struct Pending {
    slots: Mutex<HashMap<RequestId, PendingSender>>,
}

impl Pending {
    fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    async fn insert(&self, id: RequestId, tx: PendingSender) {
        self.slots.lock().await.insert(id, tx);
    }

    async fn remove(&self, id: &RequestId) -> Option<PendingSender> {
        self.slots.lock().await.remove(id)
    }

    /// Deliver `err` to every outstanding slot and drop them all — used on
    /// `stop()` and on a fatal transport failure.
    async fn fail_all(&self, make_err: impl Fn() -> ClientError) {
        let mut guard = self.slots.lock().await;
        for (_, tx) in guard.drain() {
            let _ = tx.send(Err(make_err()));
        }
    }
}

/// A running (or previously running) MCP client for one server.
pub struct McpClient {
    server_name: String,
    status: RwLock<ClientStatus>,
    last_error: RwLock<Option<String>>,
    transport: RwLock<Option<Arc<StdioTransport>>>,
    pending: Arc<Pending>,
    id_counter: AtomicI64,
    tools: RwLock<Vec<Tool>>,
}

impl McpClient {
    /// Construct a client in the `Stopped` state. Call [`start`](Self::start)
    /// to spawn the subprocess and run the handshake.
    pub fn new(server_name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            server_name: server_name.into(),
            status: RwLock::new(ClientStatus::Stopped),
            last_error: RwLock::new(None),
            transport: RwLock::new(None),
            pending: Arc::new(Pending::new()),
            id_counter: AtomicI64::new(1),
            tools: RwLock::new(Vec::new()),
        })
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub async fn status(&self) -> ClientStatus {
        *self.status.read().await
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// Spawn `command`/`args`, perform the `initialize` handshake, send
    /// `notifications/initialized`, then fetch `tools/list`.
    ///
    /// On any failure the client transitions to `Error` and the transport
    /// (if spawned) is torn down; `start()` is not retried internally.
    pub async fn start(
        self: &Arc<Self>,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<(), ClientError> {
        *self.status.write().await = ClientStatus::Starting;

        let transport = match StdioTransport::start(command, args, env).await {
            Ok(t) => Arc::new(t),
            Err(e) => {
                let err = ClientError::SpawnFailed(e);
                self.fail(&err).await;
                return Err(err);
            }
        };
        *self.transport.write().await = Some(Arc::clone(&transport));
        self.spawn_reader(Arc::clone(&transport));

        if let Err(e) = self.handshake().await {
            self.fail(&e).await;
            self.teardown_transport().await;
            return Err(e);
        }

        *self.status.write().await = ClientStatus::Running;

        if let Err(e) = self.refresh_tools().await {
            self.fail(&e).await;
            self.teardown_transport().await;
            return Err(e);
        }

        info!(server = %self.server_name, "MCP client running");
        Ok(())
    }

    async fn handshake(&self) -> Result<(), ClientError> {
        let init = self
            .send_request::<InitializeRequest>(
                InitializeRequestParams {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    capabilities: ClientCapabilities::default(),
                    client_info: Implementation {
                        name: "toolbridge".to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                    },
                },
                DEFAULT_INITIALIZE_TIMEOUT,
            )
            .await?;

        if init.protocol_version != PROTOCOL_VERSION {
            warn!(
                server = %self.server_name,
                got = %init.protocol_version,
                want = PROTOCOL_VERSION,
                "server advertised a different MCP protocol version"
            );
        }

        // A server whose capabilities omit `tools` has no defined semantics
        // for the `tools/list` we're about to issue; classed with other
        // protocol-level violations rather than a distinct kind.
        if init.capabilities.tools.is_none() {
            return Err(ClientError::ProtocolError(JSONRPCErrorError {
                code: -32000,
                message: "server capabilities do not advertise `tools`".to_string(),
                data: None,
            }));
        }

        self.send_notification::<InitializedNotification>(None)
            .await
    }

    /// Stop the client: cancel all pending requests with `ShuttingDown`,
    /// close the transport, transition to `Stopped`.
    pub async fn stop(&self) {
        self.pending.fail_all(|| ClientError::ShuttingDown).await;
        self.teardown_transport().await;
        *self.status.write().await = ClientStatus::Stopped;
    }

    /// Snapshot of the cached tool list — does not go over the wire.
    pub async fn list_tools(&self) -> Vec<Tool> {
        self.tools.read().await.clone()
    }

    /// Issue `tools/list` and atomically replace the cache.
    pub async fn refresh_tools(&self) -> Result<(), ClientError> {
        let result = self
            .send_request::<ListToolsRequest>(
                Some(ListToolsRequestParams::default()),
                DEFAULT_LIST_TOOLS_TIMEOUT,
            )
            .await?;
        *self.tools.write().await = result.tools;
        Ok(())
    }

    /// Issue `tools/call` for `name` with `arguments`.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Value>,
    ) -> Result<CallToolResult, ClientError> {
        let status = self.status().await;
        if status != ClientStatus::Running {
            return Err(ClientError::NotRunning(status));
        }
        self.send_request::<CallToolRequest>(
            CallToolRequestParams {
                name: name.to_string(),
                arguments,
            },
            DEFAULT_CALL_TOOL_TIMEOUT,
        )
        .await
    }

    async fn fail(&self, err: &ClientError) {
        error!(server = %self.server_name, error = %err, "MCP client entering Error state");
        *self.last_error.write().await = Some(err.to_string());
        *self.status.write().await = ClientStatus::Error;
    }

    async fn teardown_transport(&self) {
        if let Some(transport) = self.transport.write().await.take() {
            if let Err(e) = transport.stop().await {
                warn!(server = %self.server_name, error = %e, "error stopping transport");
            }
        }
    }

    async fn send_request<R>(
        &self,
        params: R::Params,
        timeout: Duration,
    ) -> Result<R::Result, ClientError>
    where
        R: ModelContextProtocolRequest,
        R::Params: Serialize,
        R::Result: DeserializeOwned,
    {
        let transport = {
            let guard = self.transport.read().await;
            guard.as_ref().cloned()
        }
        .ok_or(ClientError::TransportClosed)?;

        let id = RequestId::Integer(self.id_counter.fetch_add(1, Ordering::SeqCst));

        let params_json = serde_json::to_value(&params)?;
        let params_field = if params_json.is_null() {
            None
        } else {
            Some(params_json)
        };

        let request = JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.clone(),
            method: R::METHOD.to_string(),
            params: params_field,
        };
        let line = serde_json::to_string(&request)?;

        let (tx, rx) = oneshot::channel();
        // Register before writing so a response that beats us to the
        // scheduler can't be dropped on the floor.
        self.pending.insert(id.clone(), tx).await;

        if let Err(e) = transport.write(&line).await {
            warn!(server = %self.server_name, error = %e, "write to child stdin failed");
            self.pending.remove(&id).await;
            return Err(ClientError::TransportClosed);
        }

        let result = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(msg)) => msg,
            Ok(Err(_)) => {
                self.pending.remove(&id).await;
                Err(ClientError::TransportClosed)
            }
            Err(_elapsed) => {
                self.pending.remove(&id).await;
                Err(ClientError::Timeout)
            }
        }?;

        match result {
            JSONRPCMessage::Response(resp) => Ok(serde_json::from_value(resp.result)?),
            JSONRPCMessage::Error(err) => Err(ClientError::ProtocolError(err.error)),
            other => {
                warn!(?other, "unexpected message variant in reply path");
                Err(ClientError::TransportClosed)
            }
        }
    }

    async fn send_notification<N>(&self, params: N::Params) -> Result<(), ClientError>
    where
        N: ModelContextProtocolNotification,
        N::Params: Serialize,
    {
        let transport = {
            let guard = self.transport.read().await;
            guard.as_ref().cloned()
        }
        .ok_or(ClientError::TransportClosed)?;

        let params_json = serde_json::to_value(&params)?;
        let params_field = if params_json.is_null() {
            None
        } else {
            Some(params_json)
        };
        let notification = JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: N::METHOD.to_string(),
            params: params_field,
        };
        let line = serde_json::to_string(&notification)?;
        transport.write(&line).await.map_err(|e| {
            warn!(server = %self.server_name, error = %e, "write to child stdin failed");
            ClientError::TransportClosed
        })
    }

    fn spawn_reader(self: &Arc<Self>, transport: Arc<StdioTransport>) {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match transport.read_line().await {
                    Ok(Some(line)) => client.handle_line(&line).await,
                    Ok(None) => {
                        debug!(server = %client.server_name, "transport EOF");
                        client.on_reader_closed().await;
                        break;
                    }
                    Err(e) => {
                        warn!(server = %client.server_name, error = %e, "transport read error");
                        client.on_reader_closed().await;
                        break;
                    }
                }
            }
        });
    }

    async fn on_reader_closed(&self) {
        // A reader closing after a deliberate stop() is expected, not fatal.
        if *self.status.read().await == ClientStatus::Stopped {
            return;
        }
        self.pending.fail_all(|| ClientError::TransportClosed).await;
        *self.last_error.write().await = Some(ClientError::TransportClosed.to_string());
        *self.status.write().await = ClientStatus::Error;
    }

    async fn handle_line(self: &Arc<Self>, line: &str) {
        let message = match mcp_types::decode(line) {
            Ok(m) => m,
            Err(e) => {
                warn!(server = %self.server_name, error = %e, line, "dropping malformed frame");
                *self.last_error.write().await = Some(e.to_string());
                return;
            }
        };

        match message {
            JSONRPCMessage::Response(resp) => {
                self.dispatch(resp.id.clone(), JSONRPCMessage::Response(resp))
                    .await;
            }
            JSONRPCMessage::Error(err) => {
                self.dispatch(err.id.clone(), JSONRPCMessage::Error(err))
                    .await;
            }
            JSONRPCMessage::Notification(notification) => {
                self.handle_notification(notification).await;
            }
            JSONRPCMessage::Request(request) => self.reject_server_request(request).await,
        }
    }

    async fn dispatch(&self, id: RequestId, message: JSONRPCMessage) {
        match self.pending.remove(&id).await {
            Some(tx) => {
                let _ = tx.send(Ok(message));
            }
            None => warn!(%id, "no pending request found for response"),
        }
    }

    async fn handle_notification(self: &Arc<Self>, notification: JSONRPCNotification) {
        match notification.method.as_str() {
            m if m == ToolListChangedNotification::METHOD => {
                debug!(server = %self.server_name, "tools/list_changed received, scheduling refresh");
                // Dispatched onto its own task so the reader loop keeps
                // draining stdout while the refresh round-trips.
                let client = Arc::clone(self);
                tokio::spawn(async move {
                    if let Err(e) = client.refresh_tools().await {
                        warn!(server = %client.server_name, error = %e, "refresh after list_changed failed");
                    }
                });
            }
            other => {
                debug!(server = %self.server_name, method = other, "ignoring unknown notification");
            }
        }
    }

    /// Server-initiated requests aren't supported; reply method-not-found
    /// to stay protocol-conformant instead of leaving the server hanging.
    async fn reject_server_request(&self, request: JSONRPCRequest) {
        warn!(server = %self.server_name, method = %request.method, "server-initiated request unsupported");
        let Some(transport) = self.transport.read().await.clone() else {
            return;
        };
        let error = mcp_types::JSONRPCError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: request.id,
            error: mcp_types::JSONRPCErrorError {
                code: -32601,
                message: "method not found: server-initiated requests are unsupported".to_string(),
                data: None,
            },
        };
        if let Ok(line) = serde_json::to_string(&error) {
            let _ = transport.write(&line).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_equality() {
        assert_eq!(ClientStatus::Running, ClientStatus::Running);
        assert_ne!(ClientStatus::Running, ClientStatus::Stopped);
    }
}
