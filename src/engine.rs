//! Engine facade and lifecycle (spec §4, §5.3).
//!
//! `Engine` owns every long-lived collaborator: the vector index, the
//! describer/embedder, the supervisor registry, the addressing fabric, and
//! the background queue. `Engine::enter` starts the background queue's
//! subscribers; `Engine::shutdown` tears everything down in reverse tier
//! order — supervisors, then subscribers, then any still-live background
//! tasks, then the addressing context — suppressing per-tier errors so every
//! tier still runs (spec §5.3): a broadcast shutdown signal reaches every
//! listener regardless of any individual listener's outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::McpConfig;
use crate::descriptor::Describer;
use crate::embedding::Embedder;
use crate::error::{EngineError, Result};
use crate::fabric::{Fabric, DEFAULT_PRIORITY, DEFAULT_TIMEOUT_SECS};
use crate::fingerprint::server_fingerprint;
use crate::index::{SearchHit, VectorIndex};
use crate::indexer::{index_all, index_one, IndexContext};
use crate::queue::{BackgroundQueue, TaskHandle, TaskOutcome};
use crate::router::AddressingContext;
use crate::settings::EngineSettings;
use crate::supervisor::Supervisor;

pub struct Engine {
    config: McpConfig,
    settings: EngineSettings,
    index_ctx: IndexContext,
    index: Arc<dyn VectorIndex>,
    addressing: AddressingContext,
    supervisors: Arc<RwLock<HashMap<String, Arc<Supervisor>>>>,
    queue: Arc<BackgroundQueue>,
    fabric: Fabric,
}

impl Engine {
    pub fn new(
        config: McpConfig,
        settings: EngineSettings,
        index: Arc<dyn VectorIndex>,
        describer: Arc<dyn Describer>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let queue = BackgroundQueue::new(settings.background_queue_size);
        let supervisors = Arc::new(RwLock::new(HashMap::new()));
        let fabric = Fabric::new(supervisors.clone(), queue.clone());
        let index_ctx = IndexContext::new(index.clone(), describer, embedder, settings.clone());

        Self {
            config,
            settings,
            index_ctx,
            index,
            addressing: AddressingContext::new(),
            supervisors,
            queue,
            fabric,
        }
    }

    /// Starts the background queue's subscriber pool. Call once before
    /// serving any requests.
    pub async fn enter(&self) {
        self.queue
            .spawn_subscribers(self.settings.background_queue_max_subscribers)
            .await;
        info!(
            "engine entered scope with {} background subscriber(s)",
            self.settings.background_queue_max_subscribers
        );
    }

    // -- Indexing ---------------------------------------------------------

    pub async fn index_all(&self) -> Result<Vec<String>> {
        index_all(&self.index_ctx, &self.config).await
    }

    pub async fn index_one(&self, server_name: &str) -> Result<()> {
        let spec = self
            .config
            .get(server_name)
            .ok_or_else(|| EngineError::not_found(server_name))?
            .clone();
        index_one(&self.index_ctx, server_name, &spec).await
    }

    pub async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        self.index.search(query_vector, limit).await
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Starts a server's subprocess and registers it for calls, returning
    /// [`EngineError::AlreadyRunning`] if already started.
    pub async fn start_server(&self, server_name: &str) -> Result<()> {
        let spec = self
            .config
            .get(server_name)
            .ok_or_else(|| EngineError::not_found(server_name))?
            .clone();

        let supervisor = {
            let mut supervisors = self.supervisors.write().await;
            if supervisors.contains_key(server_name) {
                return Err(EngineError::AlreadyRunning(server_name.to_string()));
            }
            let supervisor = Supervisor::new(server_name, self.addressing.clone());
            supervisors.insert(server_name.to_string(), supervisor.clone());
            supervisor
        };

        if let Err(e) = supervisor.start(&spec).await {
            self.supervisors.write().await.remove(server_name);
            return Err(e);
        }

        Ok(())
    }

    pub async fn shutdown_server(&self, server_name: &str) -> Result<()> {
        let supervisor = self
            .supervisors
            .write()
            .await
            .remove(server_name)
            .ok_or_else(|| EngineError::not_found(server_name))?;
        supervisor.shutdown().await;
        Ok(())
    }

    pub async fn list_running(&self) -> Vec<String> {
        self.supervisors.read().await.keys().cloned().collect()
    }

    pub fn fingerprint_of(&self, server_name: &str) -> String {
        server_fingerprint(server_name)
    }

    // -- Execution ------------------------------------------------------

    pub async fn execute(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<serde_json::Value> {
        let timeout = timeout.unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS));
        self.fabric.execute(server_name, tool_name, arguments, timeout).await
    }

    pub async fn execute_background(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: serde_json::Value,
        priority: Option<i32>,
        timeout: Option<Duration>,
    ) -> Result<TaskHandle> {
        let priority = priority.unwrap_or(DEFAULT_PRIORITY);
        let timeout = timeout.unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS));
        self.fabric
            .execute_background(server_name, tool_name, arguments, priority, timeout)
            .await
    }

    pub async fn poll(&self, handle: TaskHandle) -> Result<TaskOutcome> {
        self.fabric.poll(handle).await
    }

    /// Coordinated shutdown (spec §5.3): supervisors first, then the
    /// background queue's subscribers, so no in-flight background task can
    /// reach a server that has already gone away. Each tier's errors are
    /// logged, never propagated, so every tier still runs.
    pub async fn shutdown(&self) {
        let names: Vec<String> = self.supervisors.read().await.keys().cloned().collect();
        for name in names {
            if let Some(supervisor) = self.supervisors.write().await.remove(&name) {
                supervisor.shutdown().await;
            }
        }

        self.queue.shutdown().await;

        if self.addressing.len().await != 0 {
            warn!("addressing context still has live endpoints after shutdown");
        }

        info!("engine shutdown complete");
    }
}
