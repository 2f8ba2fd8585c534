//! Ambient engine settings, sourced from environment variables.
//!
//! Field names and defaults are grounded in `original_source`'s
//! `ApiKeysSettings` (`omnimcp/settings.py`, imported by `pulsar_mcp`'s
//! engine): model names, the embedding weight `alpha`, rate limits, and the
//! background queue sizing all come from there.

use std::env;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_or_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Runtime knobs for the engine, independent of the per-server [`crate::config::McpConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub descriptor_model_name: String,
    pub embedding_model_name: String,
    pub embedding_dimensions: usize,
    pub index_name: String,

    /// Convex-combination weight for [`crate::embedding::blend`] (spec §4.2).
    pub embedding_weight_alpha: f32,

    /// Max concurrent `DescribeServer` calls across the fleet (spec §4.3).
    pub server_index_rate_limit: usize,

    /// Max concurrent `EnhanceTool`+embed calls across the fleet (spec §4.3).
    pub tool_index_rate_limit: usize,

    /// Background queue bounded capacity (spec §5.2).
    pub background_queue_size: usize,

    /// Number of subscriber worker tasks draining the background queue (spec §5.2).
    pub background_queue_max_subscribers: usize,

    /// Poll interval suggested to callers of the background queue (spec §5.2).
    pub polling_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            descriptor_model_name: env_or_string("DESCRIPTOR_MODEL_NAME", "gpt-4.1-mini"),
            embedding_model_name: env_or_string("EMBEDDING_MODEL_NAME", "text-embedding-3-small"),
            embedding_dimensions: env_or("DIMENSIONS", 1024),
            index_name: env_or_string("INDEX_NAME", "pulsar_idx"),
            embedding_weight_alpha: env_or("MCP_SERVER_EMBEDDING_WEIGHTS", 0.1),
            server_index_rate_limit: env_or("MCP_SERVER_INDEX_RATE_LIMIT", 3),
            tool_index_rate_limit: env_or("MCP_SERVER_TOOL_INDEX_RATE_LIMIT", 32),
            background_queue_size: env_or("BACKGROUND_MCP_TOOL_QUEUE_SIZE", 64),
            background_queue_max_subscribers: env_or(
                "BACKGROUND_MCP_TOOL_QUEUE_MAX_SUBSCRIBERS",
                8,
            ),
            polling_interval: Duration::from_millis(env_or(
                "MCP_SERVER_POLLING_INTERVAL_MS",
                5000,
            )),
        }
    }
}

impl EngineSettings {
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_values() {
        let s = EngineSettings::default();
        assert_eq!(s.descriptor_model_name, "gpt-4.1-mini");
        assert_eq!(s.embedding_model_name, "text-embedding-3-small");
        assert_eq!(s.embedding_dimensions, 1024);
        assert_eq!(s.index_name, "pulsar_idx");
        assert!((s.embedding_weight_alpha - 0.1).abs() < f32::EPSILON);
        assert_eq!(s.server_index_rate_limit, 3);
        assert_eq!(s.tool_index_rate_limit, 32);
        assert_eq!(s.background_queue_size, 64);
        assert_eq!(s.background_queue_max_subscribers, 8);
        assert_eq!(s.polling_interval, Duration::from_millis(5000));
    }
}
