//! Vector-index seam (spec §1, §4.1) — the engine's only dependency on a
//! vector store. Grounded in `original_source/src/pulsar_mcp/services/index.py`
//! (`IndexService`, Qdrant-backed): point IDs, server/tool records, and the
//! method surface (`add_server`/`add_tool`/`search`/`list_*`/`delete_server`)
//! all mirror that file, translated to a trait so the engine stays storage-agnostic.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// A server-level record: one vector per indexed server (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerRecord {
    pub point_id: Uuid,
    pub server_name: String,
    pub fingerprint: String,
    pub title: String,
    pub summary: String,
    pub capabilities: Vec<String>,
    pub limitations: Vec<String>,
    /// Exact number of tool records committed for this server (spec §3
    /// invariant 2: must equal the count of tool records with this
    /// `server_name`).
    pub nb_tools: usize,
    pub vector: Vec<f32>,
}

/// A tool-level record: one vector per indexed tool (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolRecord {
    pub point_id: Uuid,
    pub server_name: String,
    pub tool_name: String,
    pub fingerprint: String,
    pub description: String,
    pub enhanced_description: String,
    pub schema: serde_json::Value,
    pub vector: Vec<f32>,
}

/// A similarity search hit, agnostic of whether it names a server or a tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SearchHit {
    Server(ServerRecord),
    Tool(ToolRecord),
}

/// The vector store the engine indexes into and searches (spec §4.1, §4.4).
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn add_server(&self, record: ServerRecord) -> Result<()>;

    async fn add_tool(&self, record: ToolRecord) -> Result<()>;

    async fn get_server(&self, server_name: &str) -> Result<Option<ServerRecord>>;

    async fn get_tool(&self, server_name: &str, tool_name: &str) -> Result<Option<ToolRecord>>;

    /// Removes a server record and all tool records scoped to it.
    async fn delete_server(&self, server_name: &str) -> Result<()>;

    /// Cosine (or equivalent) similarity search over both servers and tools.
    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchHit>>;

    async fn list_servers(&self) -> Result<Vec<ServerRecord>>;

    async fn list_tools(&self, server_name: &str) -> Result<Vec<ToolRecord>>;

    async fn nb_servers(&self) -> Result<usize>;

    async fn nb_tools(&self) -> Result<usize>;
}
