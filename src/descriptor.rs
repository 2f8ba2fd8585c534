//! LLM descriptor/enhancer seam (spec §1, §6) and the bundle types they
//! produce, grounded in `original_source/src/pulsar_mcp/types.py` and
//! `mcp_engine.py`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::StartupSpec;
use crate::error::Result;

/// `{title, summary, capabilities[], limitations[]}`, as produced by
/// `DescribeServer` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerDescription {
    pub title: String,
    pub summary: String,
    pub capabilities: Vec<String>,
    pub limitations: Vec<String>,
}

impl ServerDescription {
    /// The text embedded for the server vector: `title\nsummary\nCapabilities:
    /// ...\nLimitations: ...`, matching `_index_single_server` in the
    /// original (`mcp_engine.py`).
    pub fn embedding_text(&self) -> String {
        format!(
            "{}\n{}\nCapabilities: {}\nLimitations: {}",
            self.title,
            self.summary,
            self.capabilities.join(", "),
            self.limitations.join(", ")
        )
    }
}

/// A raw tool advertised by a server before enhancement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTool {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

/// Full-server bundle (intermediate, never persisted as-is) — spec §3.
#[derive(Debug, Clone)]
pub struct FullServerBundle {
    pub server_name: String,
    pub description: ServerDescription,
    pub tools: Vec<RawTool>,
}

/// External LLM descriptor/enhancer collaborator (spec §1, §6).
///
/// Out of scope: "treated as two async pure functions `DescribeServer` and
/// `EnhanceTool`".
#[async_trait]
pub trait Describer: Send + Sync {
    /// `DescribeServer(name, spec, timeout) -> {description, tools[...]}`.
    /// May raise Timeout or RPCError (both surfaced as [`crate::error::EngineError`]).
    async fn describe_server(
        &self,
        server_name: &str,
        spec: &StartupSpec,
        timeout: Duration,
    ) -> Result<FullServerBundle>;

    /// `EnhanceTool(server, name, description, schema) -> string`.
    async fn enhance_tool(
        &self,
        server_name: &str,
        tool_name: &str,
        description: &str,
        schema: &Value,
    ) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_matches_original_template() {
        let desc = ServerDescription {
            title: "FS".to_string(),
            summary: "Files".to_string(),
            capabilities: vec!["r".to_string(), "w".to_string()],
            limitations: vec!["local".to_string()],
        };
        assert_eq!(
            desc.embedding_text(),
            "FS\nFiles\nCapabilities: r, w\nLimitations: local"
        );
    }
}
