//! Scripted stdio MCP server used only by this crate's integration tests.
//!
//! Reads newline-delimited JSON-RPC from stdin, writes responses to stdout.
//! The scenario is selected by `argv[1]`:
//!
//! - `echo` (default): a conforming server exposing one tool, `echo`.
//! - `float-ids`: like `echo`, but every response id is rendered as a JSON
//!   float (`1.0` rather than `1`), to exercise id normalization.
//! - `hang`: accepts everything written to stdin and responds to nothing.
//! - `no-tools-capability`: `initialize` succeeds but omits `tools` from
//!   its capabilities.
//! - `list-changed`: serves one tool set, then a fixed delay after
//!   `notifications/initialized` emits `notifications/tools/list_changed`
//!   and serves a different tool set on the next `tools/list`.
//! - `call-error`: `tools/call` always returns a JSON-RPC error object.

use std::io::BufRead;
use std::io::Write;
use std::time::Duration;

fn main() {
    let scenario = std::env::args().nth(1).unwrap_or_else(|| "echo".to_string());
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut list_changed_sent = false;
    let mut tools_list_calls = 0u32;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if scenario == "hang" {
            continue;
        }

        let request: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(_) => {
                write_line(&mut out, &parse_error());
                continue;
            }
        };

        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
        let id = request.get("id").cloned();

        if method == "notifications/initialized" {
            if scenario == "list-changed" {
                std::thread::sleep(Duration::from_millis(50));
                write_line(&mut out, &tools_list_changed_notification());
                list_changed_sent = true;
            }
            continue;
        }

        let Some(id) = id else {
            // Any other notification: ignore.
            continue;
        };

        let response = match method {
            "initialize" => handle_initialize(&id, &scenario),
            "tools/list" => {
                tools_list_calls += 1;
                handle_tools_list(&id, &scenario, list_changed_sent, tools_list_calls)
            }
            "tools/call" => handle_tools_call(&id, &request, &scenario),
            _ => make_error(&id, -32601, &format!("Method not found: {method}")),
        };

        write_line(&mut out, &response);
    }
}

fn write_line(out: &mut impl Write, value: &serde_json::Value) {
    let _ = writeln!(out, "{value}");
    let _ = out.flush();
}

fn parse_error() -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": null,
        "error": {"code": -32700, "message": "Parse error"}
    })
}

fn make_error(id: &serde_json::Value, code: i64, message: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {"code": code, "message": message}
    })
}

fn handle_initialize(id: &serde_json::Value, scenario: &str) -> serde_json::Value {
    let id = float_id_if_needed(id, scenario);
    let capabilities = if scenario == "no-tools-capability" {
        serde_json::json!({})
    } else {
        serde_json::json!({"tools": {}})
    };
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": "2024-11-05",
            "capabilities": capabilities,
            "serverInfo": {"name": "mock-mcp-server", "version": "0.0.0"}
        }
    })
}

fn handle_tools_list(
    id: &serde_json::Value,
    scenario: &str,
    list_changed_sent: bool,
    call_count: u32,
) -> serde_json::Value {
    let id = float_id_if_needed(id, scenario);
    let tools = if scenario == "list-changed" && list_changed_sent && call_count > 1 {
        serde_json::json!([
            {
                "name": "reverse",
                "description": "Reverses input",
                "inputSchema": {"type": "object", "properties": {"text": {"type": "string"}}}
            }
        ])
    } else {
        serde_json::json!([
            {
                "name": "echo",
                "description": "Echoes input",
                "inputSchema": {"type": "object", "properties": {"text": {"type": "string"}}}
            }
        ])
    };
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {"tools": tools}
    })
}

fn handle_tools_call(
    id: &serde_json::Value,
    request: &serde_json::Value,
    scenario: &str,
) -> serde_json::Value {
    if scenario == "call-error" {
        return make_error(id, -32000, "tool execution failed");
    }

    let params = request.get("params").cloned().unwrap_or_default();
    let name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
    let args = params.get("arguments").cloned().unwrap_or_default();

    if name == "echo" {
        let text = args.get("text").and_then(|t| t.as_str()).unwrap_or("");
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": float_id_if_needed(id, scenario),
            "result": {
                "content": [{"type": "text", "text": text}],
                "isError": false
            }
        })
    } else if name == "reverse" {
        let text: String = args.get("text").and_then(|t| t.as_str()).unwrap_or("").to_string();
        let reversed: String = text.chars().rev().collect();
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": float_id_if_needed(id, scenario),
            "result": {
                "content": [{"type": "text", "text": reversed}],
                "isError": false
            }
        })
    } else {
        make_error(id, -32602, &format!("unknown tool: {name}"))
    }
}

fn tools_list_changed_notification() -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": "notifications/tools/list_changed"
    })
}

/// The `float-ids` scenario re-encodes an integer id as a JSON float so the
/// client's id normalization is exercised on the way back in.
fn float_id_if_needed(id: &serde_json::Value, scenario: &str) -> serde_json::Value {
    if scenario == "float-ids" {
        if let Some(i) = id.as_i64() {
            return serde_json::json!(i as f64);
        }
    }
    id.clone()
}
