//! Shared test doubles for engine integration tests (spec §8).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use mcp_router_engine::config::StartupSpec;
use mcp_router_engine::descriptor::{Describer, FullServerBundle, RawTool, ServerDescription};
use mcp_router_engine::embedding::Embedder;
use mcp_router_engine::EngineError;

/// `DescribeServer` stub returning a fixed bundle of named tools, optionally
/// failing `enhance_tool` for a configured subset.
pub struct StubDescriber {
    pub tools: Vec<&'static str>,
    pub fail_enhance_for: Vec<&'static str>,
}

#[async_trait]
impl Describer for StubDescriber {
    async fn describe_server(
        &self,
        server_name: &str,
        _spec: &StartupSpec,
        _timeout: Duration,
    ) -> mcp_router_engine::Result<FullServerBundle> {
        Ok(FullServerBundle {
            server_name: server_name.to_string(),
            description: ServerDescription {
                title: "FS".to_string(),
                summary: "Files".to_string(),
                capabilities: vec!["r".to_string(), "w".to_string()],
                limitations: vec!["local".to_string()],
            },
            tools: self
                .tools
                .iter()
                .map(|name| RawTool {
                    name: name.to_string(),
                    description: format!("does {name}"),
                    schema: serde_json::json!({}),
                })
                .collect(),
        })
    }

    async fn enhance_tool(
        &self,
        _server_name: &str,
        tool_name: &str,
        description: &str,
        _schema: &serde_json::Value,
    ) -> mcp_router_engine::Result<String> {
        if self.fail_enhance_for.contains(&tool_name) {
            return Err(EngineError::tool_error("fs", tool_name, "enhance failed"));
        }
        Ok(description.to_string())
    }
}

/// `Embed` stub returning the constant vector `[1, 0, 0, ...]` for every
/// call, matching spec §8 scenario 1.
pub struct ConstantEmbedder {
    pub dimensions: usize,
}

#[async_trait]
impl Embedder for ConstantEmbedder {
    async fn embed(&self, texts: &[String]) -> mcp_router_engine::Result<Vec<Vec<f32>>> {
        let mut vector = vec![0.0; self.dimensions];
        vector[0] = 1.0;
        Ok(texts.iter().map(|_| vector.clone()).collect())
    }
}

pub fn spec_for(command: &str, args: Vec<&str>) -> StartupSpec {
    StartupSpec {
        command: command.to_string(),
        args: args.into_iter().map(str::to_string).collect(),
        env: HashMap::new(),
        timeout: 5.0,
        force_reindex: false,
        include_tools: None,
        exclude_tools: None,
    }
}

/// Path to the `mock-tool-server` fixture binary, built by Cargo as a
/// regular `[[bin]]` target so `CARGO_BIN_EXE_*` resolves it.
pub fn mock_tool_server_path() -> &'static str {
    env!("CARGO_BIN_EXE_mock-tool-server")
}

pub fn mock_failing_server_path() -> &'static str {
    env!("CARGO_BIN_EXE_mock-failing-server")
}
