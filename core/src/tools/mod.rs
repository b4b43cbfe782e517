//! The unified tool namespace: builtin tools plus every tool discovered
//! from a running MCP server, gated by trust before dispatch.

pub mod builtin;
pub mod registry;
pub mod trust;

use serde_json::Value;

/// Where a [`ToolDescriptor`] comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSource {
    Builtin,
    Mcp,
}

/// One entry in the registry, regardless of backend.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    /// `<server>.<tool>` for MCP tools, bare name for builtins.
    pub qualified_name: String,
    /// The bare tool name, as understood by its owning backend.
    pub display_name: String,
    pub description: Option<String>,
    pub source: ToolSource,
    /// Empty for builtin tools.
    pub server_name: String,
    /// `false` once the owning MCP server leaves `Running`.
    pub available: bool,
    pub input_schema: Value,
}

/// The outcome of a successful [`registry::ToolRegistry::execute`] call.
#[derive(Debug, Clone)]
pub struct ToolExecutionResult {
    pub text: String,
    pub is_error: bool,
}

/// A builtin tool's in-process handler.
pub trait BuiltinTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    /// The default trust class a never-seen instance of this tool is
    /// seeded with; see [`trust::DefaultTrustClass`].
    fn default_trust_class(&self) -> trust::DefaultTrustClass;
    fn call(&self, args: Option<Value>) -> Result<ToolExecutionResult, String>;
}
