//! The unified tool registry: merges builtins with every tool discovered
//! from the MCP fleet, gates execution through the trust policy, and
//! dispatches to whichever backend owns the tool.

use std::collections::HashMap;
use std::sync::Arc;

use mcp_client::ClientStatus;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::ConfigStore;
use crate::error::ManagerError;
use crate::error::RegistryError;
use crate::mcp::manager::McpConnectionManager;

use super::BuiltinTool;
use super::ToolDescriptor;
use super::ToolExecutionResult;
use super::ToolSource;
use super::trust::DefaultTrustClass;
use super::trust::Decision;
use super::trust::TrustGate;
use super::trust::TrustLevel;

/// The unified namespace over builtin and MCP tools.
pub struct ToolRegistry {
    entries: RwLock<HashMap<String, ToolDescriptor>>,
    builtins: RwLock<HashMap<String, Arc<dyn BuiltinTool>>>,
    manager: RwLock<Option<Arc<McpConnectionManager>>>,
    trust: TrustGate,
}

impl ToolRegistry {
    pub fn new(config: Arc<dyn ConfigStore>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            builtins: RwLock::new(HashMap::new()),
            manager: RwLock::new(None),
            trust: TrustGate::new(config),
        }
    }

    /// Register a builtin tool. Idempotent on name: a second call with the
    /// same name replaces the first. Builtin names must not contain `.` —
    /// that's reserved for `<server>.<tool>` MCP qualified names.
    pub async fn register(&self, tool: Arc<dyn BuiltinTool>) {
        let name = tool.name().to_string();
        debug_assert!(!name.contains('.'), "builtin tool names must not contain '.'");

        let descriptor = ToolDescriptor {
            qualified_name: name.clone(),
            display_name: name.clone(),
            description: Some(tool.description().to_string()),
            source: ToolSource::Builtin,
            server_name: String::new(),
            available: true,
            input_schema: tool.input_schema(),
        };

        self.builtins.write().await.insert(name.clone(), tool);
        self.entries.write().await.insert(name, descriptor);
    }

    /// Attach the MCP fleet and immediately rebuild MCP entries from its
    /// current state.
    pub async fn attach_manager(&self, mgr: Arc<McpConnectionManager>) {
        *self.manager.write().await = Some(mgr);
        self.refresh_mcp_tools().await;
    }

    /// Rebuild the registry's view of MCP tools from the manager's current
    /// fleet state. Servers the manager reports `Running` for get their
    /// entries deleted and re-inserted fresh; every other known server's
    /// existing entries are kept but marked unavailable, preserving their
    /// trust settings until the server comes back or is removed.
    pub async fn refresh_mcp_tools(&self) {
        let Some(mgr) = self.manager.read().await.clone() else {
            return;
        };

        let statuses = mgr.all_statuses().await;
        let tools_by_server = mgr.all_tools().await;

        let mut entries = self.entries.write().await;

        for descriptor in entries.values_mut() {
            if descriptor.source == ToolSource::Mcp {
                descriptor.available =
                    statuses.get(&descriptor.server_name) == Some(&ClientStatus::Running);
            }
        }

        for (server_name, tools) in &tools_by_server {
            entries.retain(|_, d| !(d.source == ToolSource::Mcp && &d.server_name == server_name));
            for tool in tools {
                let qualified_name = format!("{server_name}.{}", tool.name);
                entries.insert(
                    qualified_name.clone(),
                    ToolDescriptor {
                        qualified_name,
                        display_name: tool.name.clone(),
                        description: tool.description.clone(),
                        source: ToolSource::Mcp,
                        server_name: server_name.clone(),
                        available: true,
                        input_schema: tool.input_schema.clone(),
                    },
                );
            }
        }
    }

    /// Snapshot of every known tool, stably ordered by qualified name.
    pub async fn list(&self) -> Vec<ToolDescriptor> {
        let mut out: Vec<ToolDescriptor> = self.entries.read().await.values().cloned().collect();
        out.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        out
    }

    pub async fn lookup(&self, qualified_name: &str) -> Option<ToolDescriptor> {
        self.entries.read().await.get(qualified_name).cloned()
    }

    /// Consult the trust gate, then dispatch to the owning backend. The
    /// registry's locks are released before any downstream call — the
    /// lookup above and the builtin/manager clone both complete before we
    /// ever await a subprocess or child-process round trip.
    pub async fn execute(
        &self,
        qualified_name: &str,
        args: Option<Value>,
    ) -> Result<ToolExecutionResult, RegistryError> {
        let descriptor = self
            .lookup(qualified_name)
            .await
            .ok_or_else(|| RegistryError::UnknownTool(qualified_name.to_string()))?;

        let builtin = match descriptor.source {
            ToolSource::Builtin => {
                let guard = self.builtins.read().await;
                Some(
                    guard
                        .get(&descriptor.display_name)
                        .cloned()
                        .ok_or_else(|| RegistryError::UnknownTool(qualified_name.to_string()))?,
                )
            }
            ToolSource::Mcp => None,
        };

        let default_class = builtin
            .as_ref()
            .map(|t| t.default_trust_class())
            .unwrap_or(DefaultTrustClass::Standard);

        match self.trust.decide(qualified_name, default_class) {
            Decision::Deny => return Err(RegistryError::TrustDenied(qualified_name.to_string())),
            Decision::Ask => return Err(RegistryError::TrustAsk(qualified_name.to_string())),
            Decision::Allow => {}
        }

        match builtin {
            Some(tool) => tool
                .call(args)
                .map_err(|e| RegistryError::BuiltinFailed(qualified_name.to_string(), e)),
            None => {
                let mgr = self
                    .manager
                    .read()
                    .await
                    .clone()
                    .ok_or_else(|| ManagerError::UnknownServer(descriptor.server_name.clone()))?;
                let result = mgr
                    .call_tool(&descriptor.server_name, &descriptor.display_name, args)
                    .await?;
                Ok(ToolExecutionResult {
                    text: result.text(),
                    is_error: result.is_error,
                })
            }
        }
    }

    pub async fn set_trust(
        &self,
        qualified_name: &str,
        level: TrustLevel,
    ) -> Result<(), RegistryError> {
        self.trust
            .set_level(qualified_name, level)
            .map_err(|e| RegistryError::Persist(qualified_name.to_string(), e))
    }
}
