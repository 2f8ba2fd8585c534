//! A tiny stdio JSON-RPC tool server standing in for a real MCP server in
//! supervisor/dispatch-loop integration tests (spec §8 scenarios 3, 4).
//!
//! Understands `initialize`, `tools/list`, and `tools/call` for two tools:
//! `echo` (returns its arguments immediately) and `slow` (sleeps briefly
//! before replying, to exercise the background-queue path).

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

fn main() {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let request: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(_) => continue,
        };

        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let method = request.get("method").and_then(Value::as_str).unwrap_or("");

        let response = match method {
            "initialize" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {"protocolVersion": "2024-11-05", "capabilities": {}}
            }),
            "tools/list" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {"tools": [
                    {"name": "echo", "description": "echoes its arguments", "inputSchema": {"type": "object"}},
                    {"name": "slow", "description": "sleeps then replies", "inputSchema": {"type": "object"}},
                ]}
            }),
            "tools/call" => {
                let params = request.get("params").cloned().unwrap_or(json!({}));
                let tool_name = params.get("name").and_then(Value::as_str).unwrap_or("");
                let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

                if tool_name == "slow" {
                    thread::sleep(Duration::from_millis(300));
                }

                if tool_name == "fail" {
                    json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": {"code": -32000, "message": "tool 'fail' always errors"}
                    })
                } else {
                    json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "result": {"content": [
                            {"type": "text", "text": arguments.to_string(), "annotations": {"audience": ["test"]}}
                        ]}
                    })
                }
            }
            _ => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": format!("unknown method '{method}'")}
            }),
        };

        let mut text = response.to_string();
        text.push('\n');
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}
