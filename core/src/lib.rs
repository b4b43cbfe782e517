//! The tool-integration core: the MCP fleet, the unified tool registry,
//! the trust gate, and the configuration collaborator they're all built
//! on. This crate has no UI and no language-model client of its own — it
//! is consumed by both.

pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;

pub use config::ConfigStore;
pub use config::InMemoryConfigStore;
pub use config::McpServerConfig;
pub use config::TomlConfigStore;
pub use error::ManagerError;
pub use error::RegistryError;
pub use mcp::manager::McpConnectionManager;
pub use tools::BuiltinTool;
pub use tools::ToolDescriptor;
pub use tools::ToolExecutionResult;
pub use tools::ToolSource;
pub use tools::builtin::ListDirTool;
pub use tools::builtin::ReadFileTool;
pub use tools::registry::ToolRegistry;
pub use tools::trust::DefaultTrustClass;
pub use tools::trust::Decision;
pub use tools::trust::TrustGate;
pub use tools::trust::TrustLevel;
