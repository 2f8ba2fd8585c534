//! Configuration file discovery and loading.
//!
//! Search-path priority and async `tokio::fs` loading idiom adapted from the
//! teacher's `config/loader.rs`; the wire format is now JSON, not TOML.

use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::config::McpConfig;
use crate::error::{EngineError, Result};

const CONFIG_FILE_NAME: &str = "mcp_servers.json";

/// Finds the MCP configuration file.
///
/// Search order (highest to lowest priority):
/// 1. `MCP_CONFIG_PATH` environment variable
/// 2. CLI `-c`/`--config` argument (if provided)
/// 3. `./mcp_servers.json` (current directory)
/// 4. `~/.mcp_servers.json` (home directory)
/// 5. `~/.config/mcp/mcp_servers.json` (config directory)
pub async fn find_config_path(cli_path: Option<&str>) -> Option<String> {
    if let Ok(env_path) = std::env::var("MCP_CONFIG_PATH") {
        debug!("MCP_CONFIG_PATH found: {}", env_path);
        if Path::new(&env_path).exists() {
            return Some(env_path);
        }
        debug!("MCP_CONFIG_PATH path does not exist: {}", env_path);
    }

    if let Some(path) = cli_path {
        debug!("CLI config argument found: {}", path);
        if Path::new(path).exists() {
            return Some(path.to_string());
        }
        debug!("CLI config path does not exist: {}", path);
    }

    debug!("Checking current directory config: {}", CONFIG_FILE_NAME);
    if Path::new(CONFIG_FILE_NAME).exists() {
        return Some(CONFIG_FILE_NAME.to_string());
    }

    if let Some(home_dir) = dirs::home_dir() {
        let home_path = home_dir.join(format!(".{CONFIG_FILE_NAME}"));
        let home_path_str = home_path.to_string_lossy().to_string();
        debug!("Checking home directory config: {}", home_path_str);
        if home_path.exists() {
            return Some(home_path_str);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join("mcp").join(CONFIG_FILE_NAME);
        let config_path_str = config_path.to_string_lossy().to_string();
        debug!("Checking config directory config: {}", config_path_str);
        if config_path.exists() {
            return Some(config_path_str);
        }
    }

    debug!("No config file found in standard locations");
    None
}

/// Loads and parses the MCP configuration from a file.
pub async fn load_config(path: &Path) -> Result<McpConfig> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| EngineError::config_read(path, e))?;

    debug!("Config file loaded: {}", path.display());

    let config =
        McpConfig::from_json(&content).map_err(|e| EngineError::config_parse(path, e))?;

    if config.is_empty() {
        tracing::warn!("config file '{}' defines no servers", path.display());
    } else {
        debug!(
            "config file '{}' parsed with {} server(s)",
            path.display(),
            config.mcp_servers.len()
        );
    }

    Ok(config)
}

/// Combines config discovery and loading into a single operation.
pub async fn find_and_load(cli_path: Option<&str>) -> Result<McpConfig> {
    let config_path = find_config_path(cli_path).await.ok_or_else(|| {
        EngineError::config_read(
            Path::new(CONFIG_FILE_NAME),
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "MCP configuration file not found. Search order:\n\
                 1. MCP_CONFIG_PATH environment variable\n\
                 2. CLI -c/--config argument\n\
                 3. ./mcp_servers.json (current directory)\n\
                 4. ~/.mcp_servers.json (home directory)\n\
                 5. ~/.config/mcp/mcp_servers.json (config directory)",
            ),
        )
    })?;

    load_config(Path::new(&config_path)).await
}
