//! The MCP fleet: one [`McpClient`] per configured server, fanned out with
//! per-server deadlines so a single hung server can't stall the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mcp_client::ClientStatus;
use mcp_client::McpClient;
use mcp_types::Tool;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tracing::info;
use tracing::warn;

use crate::config::McpServerConfig;
use crate::error::ManagerError;

/// Bound on a single `status()` read inside a fan-out.
const STATUS_TIMEOUT: Duration = Duration::from_millis(500);
/// Bound on a single `list_tools()`/`refresh_tools()` round trip inside a
/// fan-out that already confirmed the client is `Running`.
const LIST_TOOLS_TIMEOUT: Duration = Duration::from_secs(1);
/// Overall per-server budget for `all_tools()`: status check + list, summed.
const ALL_TOOLS_PER_SERVER_BUDGET: Duration = Duration::from_secs(2);
/// Overall per-server budget for `all_statuses()`.
const ALL_STATUSES_PER_SERVER_BUDGET: Duration = Duration::from_secs(1);

struct Managed {
    client: Arc<McpClient>,
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
}

/// Owns the fleet of running MCP clients, keyed by server name.
pub struct McpConnectionManager {
    clients: RwLock<HashMap<String, Managed>>,
    /// Serializes `reconcile` against itself; held only across the diff +
    /// start/stop, never across a caller-visible long operation.
    reconcile_lock: Mutex<()>,
}

impl Default for McpConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl McpConnectionManager {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            reconcile_lock: Mutex::new(()),
        }
    }

    /// Start a client for every enabled server in `configs`. Best-effort:
    /// every server is attempted even after an earlier one fails; the
    /// first error encountered is returned once all attempts complete.
    pub async fn start_enabled(&self, configs: &[McpServerConfig]) -> Result<(), ManagerError> {
        let mut first_error = None;
        for config in configs {
            if let Err(e) = self.start_one(config).await {
                warn!(server = %config.name, error = %e, "failed to start MCP server");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn start_one(&self, config: &McpServerConfig) -> Result<(), ManagerError> {
        let client = McpClient::new(config.name.clone());
        client
            .start(&config.command, &config.args, &config.env)
            .await
            .map_err(|source| ManagerError::Client {
                server: config.name.clone(),
                source,
            })?;
        self.clients.write().await.insert(
            config.name.clone(),
            Managed {
                client,
                command: config.command.clone(),
                args: config.args.clone(),
                env: config.env.clone(),
            },
        );
        info!(server = %config.name, "MCP server started");
        Ok(())
    }

    /// Stop every client concurrently and clear the map.
    pub async fn stop_all(&self) {
        let managed = {
            let mut guard = self.clients.write().await;
            std::mem::take(&mut *guard)
        };
        let stops = managed
            .into_values()
            .map(|m| tokio::spawn(async move { m.client.stop().await }));
        for stop in stops {
            let _ = stop.await;
        }
    }

    /// Bring the running client set into agreement with `new_configs`:
    /// stop removed/disabled servers, start newly enabled ones, leave
    /// unchanged servers (same command/args/env) untouched.
    pub async fn reconcile(&self, new_configs: &[McpServerConfig]) -> Result<(), ManagerError> {
        let _guard = self.reconcile_lock.lock().await;

        let target: HashMap<&str, &McpServerConfig> =
            new_configs.iter().map(|c| (c.name.as_str(), c)).collect();

        let to_stop: Vec<String> = {
            let clients = self.clients.read().await;
            clients
                .iter()
                .filter(|(name, managed)| match target.get(name.as_str()) {
                    None => true,
                    Some(cfg) => {
                        cfg.command != managed.command
                            || cfg.args != managed.args
                            || cfg.env != managed.env
                    }
                })
                .map(|(name, _)| name.clone())
                .collect()
        };

        for name in &to_stop {
            if let Some(managed) = self.clients.write().await.remove(name) {
                managed.client.stop().await;
            }
        }

        let mut first_error = None;
        let existing: Vec<String> = self.clients.read().await.keys().cloned().collect();
        for config in new_configs {
            if existing.contains(&config.name) {
                continue;
            }
            if let Err(e) = self.start_one(config).await {
                warn!(server = %config.name, error = %e, "failed to start MCP server during reconcile");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// A single server's status, or `None` if unknown.
    pub async fn status(&self, name: &str) -> Option<ClientStatus> {
        let client = {
            let guard = self.clients.read().await;
            guard.get(name).map(|m| Arc::clone(&m.client))
        }?;
        tokio::time::timeout(STATUS_TIMEOUT, client.status()).await.ok()
    }

    pub async fn last_error(&self, name: &str) -> Option<String> {
        let client = {
            let guard = self.clients.read().await;
            guard.get(name).map(|m| Arc::clone(&m.client))
        }?;
        client.last_error().await
    }

    /// Every configured server's status, bounded so a stuck client can't
    /// stall the accessor. Servers whose status read timed out are simply
    /// absent from the result.
    pub async fn all_statuses(&self) -> HashMap<String, ClientStatus> {
        let clients: Vec<(String, Arc<McpClient>)> = self
            .clients
            .read()
            .await
            .iter()
            .map(|(name, m)| (name.clone(), Arc::clone(&m.client)))
            .collect();

        let tasks = clients.into_iter().map(|(name, client)| {
            tokio::spawn(async move {
                let status =
                    tokio::time::timeout(ALL_STATUSES_PER_SERVER_BUDGET, client.status()).await;
                (name, status.ok())
            })
        });

        let mut out = HashMap::new();
        for task in tasks {
            if let Ok((name, Some(status))) = task.await {
                out.insert(name, status);
            }
        }
        out
    }

    /// Fan out to every `Running` client: bounded status check, then a
    /// bounded `list_tools()`. Non-responsive or non-running servers are
    /// silently omitted (with a log warning).
    pub async fn all_tools(&self) -> HashMap<String, Vec<Tool>> {
        let clients: Vec<(String, Arc<McpClient>)> = self
            .clients
            .read()
            .await
            .iter()
            .map(|(name, m)| (name.clone(), Arc::clone(&m.client)))
            .collect();

        let tasks = clients.into_iter().map(|(name, client)| {
            tokio::spawn(async move {
                let outcome = tokio::time::timeout(ALL_TOOLS_PER_SERVER_BUDGET, async {
                    let status = tokio::time::timeout(STATUS_TIMEOUT, client.status())
                        .await
                        .ok()?;
                    if status != ClientStatus::Running {
                        return None;
                    }
                    tokio::time::timeout(LIST_TOOLS_TIMEOUT, client.list_tools())
                        .await
                        .ok()
                })
                .await;
                (name, outcome.ok().flatten())
            })
        });

        let mut out = HashMap::new();
        for task in tasks {
            match task.await {
                Ok((name, Some(tools))) => {
                    out.insert(name, tools);
                }
                Ok((name, None)) => {
                    warn!(server = %name, "omitted from all_tools(): not running or unresponsive");
                }
                Err(e) => warn!(error = %e, "fan-out task panicked"),
            }
        }
        out
    }

    /// Route a `tools/call` to the named server.
    pub async fn call_tool(
        &self,
        server: &str,
        tool_name: &str,
        args: Option<serde_json::Value>,
    ) -> Result<mcp_types::CallToolResult, ManagerError> {
        let client = {
            let guard = self.clients.read().await;
            guard
                .get(server)
                .map(|m| Arc::clone(&m.client))
                .ok_or_else(|| ManagerError::UnknownServer(server.to_string()))?
        };

        if client.status().await != ClientStatus::Running {
            return Err(ManagerError::ServerNotRunning(server.to_string()));
        }

        client
            .call_tool(tool_name, args)
            .await
            .map_err(|source| ManagerError::Client {
                server: server.to_string(),
                source,
            })
    }

    /// Instruct every `Running` client to refresh its tool cache. Errors
    /// are aggregated; the first is returned, all servers are attempted.
    pub async fn refresh_tools(&self) -> Result<(), ManagerError> {
        let clients: Vec<(String, Arc<McpClient>)> = self
            .clients
            .read()
            .await
            .iter()
            .map(|(name, m)| (name.clone(), Arc::clone(&m.client)))
            .collect();

        let mut first_error = None;
        for (name, client) in clients {
            if client.status().await != ClientStatus::Running {
                continue;
            }
            if let Err(e) = client.refresh_tools().await {
                warn!(server = %name, error = %e, "refresh_tools failed");
                first_error.get_or_insert(ManagerError::Client { server: name, source: e });
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Names of every currently-tracked client, regardless of status.
    pub async fn server_names(&self) -> Vec<String> {
        self.clients.read().await.keys().cloned().collect()
    }
}
