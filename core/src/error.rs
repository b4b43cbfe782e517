//! Error kinds for the manager/registry/trust layer. Client-level kinds
//! (`SpawnFailed`, `TransportClosed`, …) live in `mcp_client::ClientError`
//! and are wrapped here rather than re-declared.

use mcp_client::ClientError;

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("no server named {0:?} is configured")]
    UnknownServer(String),
    #[error("server {0:?} is not Running")]
    ServerNotRunning(String),
    #[error("server {server:?}: {source}")]
    Client {
        server: String,
        #[source]
        source: ClientError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no tool named {0:?} is registered")]
    UnknownTool(String),
    #[error("execution of {0:?} was denied by trust policy")]
    TrustDenied(String),
    #[error("execution of {0:?} requires interactive confirmation")]
    TrustAsk(String),
    #[error(transparent)]
    Manager(#[from] ManagerError),
    #[error("builtin tool {0:?} failed: {1}")]
    BuiltinFailed(String, String),
    #[error("persisting trust level for {0:?} failed: {1}")]
    Persist(String, #[source] anyhow::Error),
}
