//! Tool execution fabric (spec §4.4): routes a call to the named server's
//! supervisor, either synchronously (`Execute`) or via the background queue
//! (`ExecuteBackground` + `Poll`).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::{EngineError, Result};
use crate::queue::{BackgroundQueue, TaskHandle, TaskOutcome};
use crate::supervisor::Supervisor;

/// Default priority assigned when a caller doesn't specify one, matching the
/// original's `priority=1` default for `poll_task_result`/`execute_tool`.
pub const DEFAULT_PRIORITY: i32 = 1;

/// Default per-call timeout in seconds, matching the original's `timeout=60.0`.
pub const DEFAULT_TIMEOUT_SECS: f64 = 60.0;

pub struct Fabric {
    supervisors: Arc<RwLock<HashMap<String, Arc<Supervisor>>>>,
    queue: Arc<BackgroundQueue>,
}

impl Fabric {
    pub fn new(supervisors: Arc<RwLock<HashMap<String, Arc<Supervisor>>>>, queue: Arc<BackgroundQueue>) -> Self {
        Self { supervisors, queue }
    }

    /// Spec §4.4: `Execute`'s precondition is "a handle for `server` exists
    /// and is in state Running; otherwise `NotRunning`" — so a missing
    /// handle is `NotRunning`, not `NotFound` (that kind is reserved for an
    /// unknown name in config/index, spec §7).
    async fn supervisor_for(&self, server_name: &str) -> Result<Arc<Supervisor>> {
        self.supervisors
            .read()
            .await
            .get(server_name)
            .cloned()
            .ok_or_else(|| EngineError::NotRunning(server_name.to_string()))
    }

    /// Executes a tool call synchronously, bounded by `timeout`.
    pub async fn execute(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        let supervisor = self.supervisor_for(server_name).await?;

        tokio::time::timeout(timeout, supervisor.call_tool(tool_name, arguments))
            .await
            .map_err(|_| EngineError::timeout(server_name, timeout.as_secs()))?
    }

    /// Submits a tool call to the background queue and returns a handle for
    /// later [`Self::poll`].
    pub async fn execute_background(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: serde_json::Value,
        priority: i32,
        timeout: Duration,
    ) -> Result<TaskHandle> {
        let supervisor = self.supervisor_for(server_name).await?;
        let tool_name = tool_name.to_string();

        let job = Box::pin(async move {
            tokio::time::timeout(timeout, supervisor.call_tool(&tool_name, arguments))
                .await
                .map_err(|_| EngineError::timeout("background task", timeout.as_secs()))?
        });

        self.queue.submit(priority, job).await
    }

    pub async fn poll(&self, handle: TaskHandle) -> Result<TaskOutcome> {
        self.queue.poll(handle).await
    }
}
