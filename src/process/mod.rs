//! Per-server subprocess client: spawn, JSON-RPC handshake, tool calls.
//!
//! `ProcessClient` is a long-lived JSON-RPC connection the engine keeps open
//! for the life of a server, rather than a one-shot request/response client.

pub mod stdio;

use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::transport::Transport;

/// A tool advertised by `tools/list`, as surfaced to callers.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// High-level JSON-RPC client over a [`Transport`].
pub struct ProcessClient {
    transport: Box<dyn Transport + Send + Sync>,
    server_name: String,
}

impl ProcessClient {
    pub fn new(server_name: String, transport: Box<dyn Transport + Send + Sync>) -> Self {
        Self {
            transport,
            server_name,
        }
    }

    pub async fn initialize(&mut self) -> Result<()> {
        let request = Self::json_rpc_request(
            "initialize",
            serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": { "roots": {}, "sampling": {}, "tools": {} },
                "clientInfo": {
                    "name": "mcp-router-engine",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        );

        let response = self.transport.send(request).await?;
        response["result"]
            .as_object()
            .ok_or_else(|| EngineError::Protocol("expected result in initialize response".into()))?;
        Ok(())
    }

    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>> {
        let request = Self::json_rpc_request("tools/list", serde_json::json!({}));
        let response = self.transport.send(request).await?;

        let result = response["result"]
            .as_object()
            .ok_or_else(|| EngineError::Protocol("expected result object in tools/list response".into()))?;

        let tools_array = result["tools"]
            .as_array()
            .ok_or_else(|| EngineError::Protocol("expected tools array in result".into()))?;

        Ok(tools_array
            .iter()
            .filter_map(|tool| {
                Some(ToolInfo {
                    name: tool["name"].as_str()?.to_string(),
                    description: tool["description"].as_str().map(str::to_string),
                    input_schema: tool["inputSchema"].clone(),
                })
            })
            .collect())
    }

    pub async fn call_tool(&mut self, tool_name: &str, arguments: Value) -> Result<Value> {
        let request = Self::json_rpc_request(
            "tools/call",
            serde_json::json!({ "name": tool_name, "arguments": arguments }),
        );

        let response = self.transport.send(request).await?;

        if let Some(error) = response.get("error") {
            return Err(EngineError::tool_error(
                self.server_name.clone(),
                tool_name,
                error.to_string(),
            ));
        }

        let result = response["result"]
            .as_object()
            .ok_or_else(|| EngineError::Protocol("expected result object in tools/call response".into()))?;

        // Drop `annotations`/`meta` from content blocks, matching the
        // original's `execute_tool` post-processing.
        let mut result = result.clone();
        if let Some(content) = result.get_mut("content").and_then(Value::as_array_mut) {
            for block in content.iter_mut() {
                if let Some(obj) = block.as_object_mut() {
                    obj.remove("annotations");
                    obj.remove("meta");
                }
            }
        }

        Ok(Value::Object(result))
    }

    pub async fn ping(&self) -> Result<()> {
        self.transport.ping().await
    }

    fn json_rpc_request(method: &str, params: Value) -> Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": Self::next_request_id(),
        })
    }

    fn next_request_id() -> u64 {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        COUNTER.fetch_add(1, Ordering::Relaxed)
    }
}

impl std::fmt::Display for ProcessClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProcessClient({})", self.server_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_request_shape() {
        let req = ProcessClient::json_rpc_request("tools/list", serde_json::json!({}));
        assert_eq!(req["jsonrpc"], "2.0");
        assert_eq!(req["method"], "tools/list");
        assert!(req["id"].is_u64());
    }
}
