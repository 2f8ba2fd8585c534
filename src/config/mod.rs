//! Configuration types for the MCP server fleet (spec §3, §6).
//!
//! Wire format is a JSON object `{"mcpServers": {name: spec, ...}}` with
//! `deny_unknown_fields` throughout ("Unknown fields are rejected", spec §6).
//! The shape comes from `original_source`'s `McpStartupConfig` (`types.py`);
//! the loader idiom (search path, `tokio::fs`, structured errors) follows
//! `config/loader.rs`.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

fn default_timeout_secs() -> f64 {
    30.0
}

/// Startup spec for a single tool server (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartupSpec {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout: f64,

    #[serde(default)]
    pub force_reindex: bool,

    /// Parsed but never enforced by the engine itself (spec §9, Open Question 2).
    #[serde(default)]
    pub include_tools: Option<Vec<String>>,

    /// Parsed but never enforced by the engine itself, same as `include_tools`.
    #[serde(default)]
    pub exclude_tools: Option<Vec<String>>,
}

impl StartupSpec {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.timeout.max(0.0))
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct McpConfigWire {
    #[serde(rename = "mcpServers")]
    mcp_servers: HashMap<String, StartupSpec>,
}

/// Root configuration: `{"mcpServers": {...}}`.
#[derive(Debug, Clone, Serialize, Default)]
pub struct McpConfig {
    pub mcp_servers: HashMap<String, StartupSpec>,
}

impl McpConfig {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let wire: McpConfigWire = serde_json::from_str(content)?;
        Ok(McpConfig {
            mcp_servers: wire.mcp_servers,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.mcp_servers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&StartupSpec> {
        self.mcp_servers.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.mcp_servers.keys().cloned().collect()
    }
}
