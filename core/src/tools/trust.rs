//! Trust gate: a three-valued policy consulted before every tool execution.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Deserialize;
use serde::Serialize;

use crate::config::ConfigStore;

/// Per-tool trust level, persisted via the configuration collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// Execution is always blocked.
    None,
    /// Defer to an interactive confirmation outside this crate.
    Ask,
    /// Execution is allowed for the lifetime of the current process.
    Session,
}

/// The outcome of consulting the gate before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
    Ask,
}

/// Classes of tool that get a different default trust level the first
/// time they're seen. Builtins not in this set, and every MCP tool,
/// default to `Ask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultTrustClass {
    /// Read-only builtins (e.g. filesystem reads) default to `Session`.
    ReadOnlyBuiltin,
    /// Everything else defaults to `Ask`.
    Standard,
}

impl DefaultTrustClass {
    fn default_level(self) -> TrustLevel {
        match self {
            DefaultTrustClass::ReadOnlyBuiltin => TrustLevel::Session,
            DefaultTrustClass::Standard => TrustLevel::Ask,
        }
    }
}

/// In-memory trust levels, seeded from and persisted through a
/// [`ConfigStore`].
pub struct TrustGate {
    config: std::sync::Arc<dyn ConfigStore>,
    levels: RwLock<HashMap<String, TrustLevel>>,
}

impl TrustGate {
    pub fn new(config: std::sync::Arc<dyn ConfigStore>) -> Self {
        Self {
            config,
            levels: RwLock::new(HashMap::new()),
        }
    }

    /// Consult the gate for `qualified_name`, seeding a default if this is
    /// the first time the tool has been seen.
    pub fn decide(&self, qualified_name: &str, default_class: DefaultTrustClass) -> Decision {
        if let Some(level) = self.cached_level(qualified_name) {
            return Self::decision_for(level);
        }

        let level = self
            .config
            .tool_trust_level(qualified_name)
            .unwrap_or_else(|| default_class.default_level());
        self.levels
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(qualified_name.to_string(), level);
        Self::decision_for(level)
    }

    fn cached_level(&self, qualified_name: &str) -> Option<TrustLevel> {
        self.levels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(qualified_name)
            .copied()
    }

    fn decision_for(level: TrustLevel) -> Decision {
        match level {
            TrustLevel::None => Decision::Deny,
            TrustLevel::Session => Decision::Allow,
            TrustLevel::Ask => Decision::Ask,
        }
    }

    /// Persist `level` for `qualified_name` and update the in-memory copy
    /// atomically with the persist.
    pub fn set_level(&self, qualified_name: &str, level: TrustLevel) -> anyhow::Result<()> {
        self.config.set_tool_trust_level(qualified_name, level)?;
        self.levels
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(qualified_name.to_string(), level);
        Ok(())
    }
}
