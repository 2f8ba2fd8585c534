//! Error types for the router engine.
//!
//! [`EngineError`] covers the engine's own error kinds (§7 of the design) plus
//! the ambient config/IO boundary every crate needs, kept in one enum to
//! match a single-error-type crate idiom rather than splitting config errors
//! into a second type.

use thiserror::Error;

/// Main error type for the router engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("server '{0}' not found")]
    NotFound(String),

    #[error("server '{0}' is already running")]
    AlreadyRunning(String),

    #[error("operation on '{0}' timed out after {1}s")]
    Timeout(String, u64),

    #[error("failed to initialize subprocess for server '{0}': {1}")]
    InitFailed(String, String),

    #[error("tool indexing aborted for server '{0}': {1}")]
    ToolIndexingAborted(String, String),

    #[error("all {0} server(s) failed to index")]
    AllFailed(usize),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("tool '{tool}' on server '{server}' failed: {message}")]
    ToolError {
        server: String,
        tool: String,
        message: String,
    },

    #[error("server '{0}' is not running")]
    NotRunning(String),

    #[error("failed to read config file '{}': {source}", path.display())]
    ConfigReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in config file '{}': {source}", path.display())]
    ConfigParseError {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl EngineError {
    pub fn not_found(server: impl Into<String>) -> Self {
        Self::NotFound(server.into())
    }

    pub fn timeout(server: impl Into<String>, secs: u64) -> Self {
        Self::Timeout(server.into(), secs)
    }

    pub fn tool_error(
        server: impl Into<String>,
        tool: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ToolError {
            server: server.into(),
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn config_read(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::ConfigReadError {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn config_parse(path: &std::path::Path, source: serde_json::Error) -> Self {
        Self::ConfigParseError {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Exit codes for the `router-daemon` binary: 1=client/usage, 2=server/protocol, 3=network/IO.
pub fn exit_code(error: &EngineError) -> i32 {
    match error {
        EngineError::NotFound(_)
        | EngineError::AlreadyRunning(_)
        | EngineError::InvalidInput(_)
        | EngineError::NotRunning(_)
        | EngineError::ConfigReadError { .. }
        | EngineError::ConfigParseError { .. } => 1,

        EngineError::Protocol(_)
        | EngineError::ToolError { .. }
        | EngineError::ToolIndexingAborted(..)
        | EngineError::AllFailed(_) => 2,

        EngineError::Timeout(..) | EngineError::InitFailed(..) | EngineError::IOError(_) => 3,
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
