//! The configuration collaborator: server descriptors and persisted trust
//! levels. Out of core scope per the spec, but a minimal implementation is
//! included so the registry/manager/trust layers are independently
//! testable without a UI.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::Context;
use serde::Deserialize;
use serde::Serialize;

use crate::tools::trust::TrustLevel;

/// One entry under `[mcp_servers.<name>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub enabled: bool,
}

/// Abstracts over where server descriptors and trust levels live, so the
/// manager/registry/trust layers don't depend on a concrete storage
/// format.
pub trait ConfigStore: Send + Sync {
    fn enabled_servers(&self) -> Vec<McpServerConfig>;
    fn tool_trust_level(&self, qualified_name: &str) -> Option<TrustLevel>;
    fn set_tool_trust_level(&self, qualified_name: &str, level: TrustLevel) -> anyhow::Result<()>;
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    mcp_servers: HashMap<String, ServerEntry>,
    #[serde(default)]
    tool_trust: HashMap<String, TrustLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerEntry {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default = "default_true")]
    enabled: bool,
}

/// A `config.toml`-backed store, mirroring the host project's own
/// configuration format.
pub struct TomlConfigStore {
    path: PathBuf,
    cache: RwLock<ConfigFile>,
}

impl TomlConfigStore {
    /// Load `path` if it exists, otherwise start from an empty document —
    /// `set_tool_trust_level` will create it on first write.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let file = if path.exists() {
            let text = fs_err::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        } else {
            ConfigFile::default()
        };
        Ok(Self {
            path,
            cache: RwLock::new(file),
        })
    }

    fn persist(&self, file: &ConfigFile) -> anyhow::Result<()> {
        let text = toml::to_string_pretty(file).context("serializing config.toml")?;
        if let Some(parent) = self.path.parent() {
            fs_err::create_dir_all(parent)?;
        }
        fs_err::write(&self.path, text)
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

impl ConfigStore for TomlConfigStore {
    fn enabled_servers(&self) -> Vec<McpServerConfig> {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .mcp_servers
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(name, entry)| McpServerConfig {
                name: name.clone(),
                command: entry.command.clone(),
                args: entry.args.clone(),
                env: entry.env.clone(),
                enabled: entry.enabled,
            })
            .collect()
    }

    fn tool_trust_level(&self, qualified_name: &str) -> Option<TrustLevel> {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .tool_trust
            .get(qualified_name)
            .copied()
    }

    fn set_tool_trust_level(&self, qualified_name: &str, level: TrustLevel) -> anyhow::Result<()> {
        let mut guard = self.cache.write().unwrap_or_else(|e| e.into_inner());
        guard.tool_trust.insert(qualified_name.to_string(), level);
        self.persist(&guard)
    }
}

/// A `HashMap`-backed store for tests, and for any caller that wants the
/// registry/trust layers without a filesystem dependency.
#[derive(Default)]
pub struct InMemoryConfigStore {
    servers: RwLock<Vec<McpServerConfig>>,
    trust: RwLock<HashMap<String, TrustLevel>>,
}

impl InMemoryConfigStore {
    pub fn with_servers(servers: Vec<McpServerConfig>) -> Self {
        Self {
            servers: RwLock::new(servers),
            trust: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_servers(&self, servers: Vec<McpServerConfig>) {
        *self.servers.write().unwrap_or_else(|e| e.into_inner()) = servers;
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn enabled_servers(&self) -> Vec<McpServerConfig> {
        self.servers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|s| s.enabled)
            .cloned()
            .collect()
    }

    fn tool_trust_level(&self, qualified_name: &str) -> Option<TrustLevel> {
        self.trust
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(qualified_name)
            .copied()
    }

    fn set_tool_trust_level(&self, qualified_name: &str, level: TrustLevel) -> anyhow::Result<()> {
        self.trust
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(qualified_name.to_string(), level);
        Ok(())
    }
}
