//! In-memory [`VectorIndex`], the default backing for tests and the
//! `router-daemon` binary when no external store is configured.
//!
//! An `Arc<Mutex<HashMap<...>>>` stand-in for a real external vector-store
//! collaborator.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{SearchHit, ServerRecord, ToolRecord, VectorIndex};
use crate::error::Result;

#[derive(Default)]
pub struct InMemoryIndex {
    servers: Mutex<HashMap<String, ServerRecord>>,
    tools: Mutex<HashMap<(String, String), ToolRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return f32::MIN;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn add_server(&self, record: ServerRecord) -> Result<()> {
        self.servers
            .lock()
            .unwrap()
            .insert(record.server_name.clone(), record);
        Ok(())
    }

    async fn add_tool(&self, record: ToolRecord) -> Result<()> {
        self.tools.lock().unwrap().insert(
            (record.server_name.clone(), record.tool_name.clone()),
            record,
        );
        Ok(())
    }

    async fn get_server(&self, server_name: &str) -> Result<Option<ServerRecord>> {
        Ok(self.servers.lock().unwrap().get(server_name).cloned())
    }

    async fn get_tool(&self, server_name: &str, tool_name: &str) -> Result<Option<ToolRecord>> {
        Ok(self
            .tools
            .lock()
            .unwrap()
            .get(&(server_name.to_string(), tool_name.to_string()))
            .cloned())
    }

    async fn delete_server(&self, server_name: &str) -> Result<()> {
        self.servers.lock().unwrap().remove(server_name);
        self.tools
            .lock()
            .unwrap()
            .retain(|(server, _), _| server != server_name);
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let mut scored: Vec<(f32, SearchHit)> = Vec::new();

        for record in self.servers.lock().unwrap().values() {
            scored.push((
                cosine(query_vector, &record.vector),
                SearchHit::Server(record.clone()),
            ));
        }
        for record in self.tools.lock().unwrap().values() {
            scored.push((
                cosine(query_vector, &record.vector),
                SearchHit::Tool(record.clone()),
            ));
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored.into_iter().map(|(_, hit)| hit).collect())
    }

    async fn list_servers(&self) -> Result<Vec<ServerRecord>> {
        Ok(self.servers.lock().unwrap().values().cloned().collect())
    }

    async fn list_tools(&self, server_name: &str) -> Result<Vec<ToolRecord>> {
        Ok(self
            .tools
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.server_name == server_name)
            .cloned()
            .collect())
    }

    async fn nb_servers(&self) -> Result<usize> {
        Ok(self.servers.lock().unwrap().len())
    }

    async fn nb_tools(&self) -> Result<usize> {
        Ok(self.tools.lock().unwrap().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::point_id;

    fn server(name: &str, vector: Vec<f32>) -> ServerRecord {
        ServerRecord {
            point_id: point_id(name),
            server_name: name.to_string(),
            fingerprint: format!("fp-{name}"),
            title: name.to_string(),
            summary: "summary".to_string(),
            capabilities: vec![],
            limitations: vec![],
            nb_tools: 0,
            vector,
        }
    }

    #[tokio::test]
    async fn test_add_and_get_server() {
        let index = InMemoryIndex::new();
        index.add_server(server("fs", vec![1.0, 0.0])).await.unwrap();
        let got = index.get_server("fs").await.unwrap();
        assert!(got.is_some());
        assert_eq!(got.unwrap().server_name, "fs");
    }

    #[tokio::test]
    async fn test_delete_server_removes_its_tools() {
        let index = InMemoryIndex::new();
        index.add_server(server("fs", vec![1.0, 0.0])).await.unwrap();
        index
            .add_tool(ToolRecord {
                point_id: point_id("fs::read"),
                server_name: "fs".to_string(),
                tool_name: "read".to_string(),
                fingerprint: "fp".to_string(),
                description: "reads".to_string(),
                enhanced_description: "reads files".to_string(),
                schema: serde_json::json!({}),
                vector: vec![1.0, 0.0],
            })
            .await
            .unwrap();

        index.delete_server("fs").await.unwrap();
        assert_eq!(index.nb_servers().await.unwrap(), 0);
        assert_eq!(index.nb_tools().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let index = InMemoryIndex::new();
        index.add_server(server("a", vec![1.0, 0.0])).await.unwrap();
        index.add_server(server("b", vec![0.0, 1.0])).await.unwrap();

        let hits = index.search(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        match &hits[0] {
            SearchHit::Server(r) => assert_eq!(r.server_name, "a"),
            _ => panic!("expected server hit"),
        }
    }
}
