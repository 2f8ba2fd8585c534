//! Per-server supervised subprocess (spec §4.1, §5.1).
//!
//! Lifecycle: `Pending -> Running -> Stopped|Failed`. `Start` spawns the
//! subprocess, initializes it, registers an [`AddressingContext`] endpoint,
//! and spawns a dispatch loop task draining that endpoint and forwarding
//! calls to the subprocess. `Shutdown` releases everything the supervisor
//! acquired, in reverse order.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::StartupSpec;
use crate::error::{EngineError, Result};
use crate::fingerprint::server_fingerprint;
use crate::process::stdio::StdioTransport;
use crate::process::{ProcessClient, ToolInfo};
use crate::router::AddressingContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Pending,
    Running,
    Stopped,
    Failed,
}

impl From<u8> for SupervisorState {
    fn from(v: u8) -> Self {
        match v {
            0 => SupervisorState::Pending,
            1 => SupervisorState::Running,
            2 => SupervisorState::Stopped,
            _ => SupervisorState::Failed,
        }
    }
}

impl From<SupervisorState> for u8 {
    fn from(s: SupervisorState) -> Self {
        match s {
            SupervisorState::Pending => 0,
            SupervisorState::Running => 1,
            SupervisorState::Stopped => 2,
            SupervisorState::Failed => 3,
        }
    }
}

/// Default channel capacity for a server's router endpoint.
const ENDPOINT_CAPACITY: usize = 64;

pub struct Supervisor {
    pub server_name: String,
    pub fingerprint: String,
    state: AtomicU8,
    client: Mutex<Option<ProcessClient>>,
    tools: Mutex<Vec<ToolInfo>>,
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,
    addressing: AddressingContext,
}

impl Supervisor {
    pub fn new(server_name: &str, addressing: AddressingContext) -> Arc<Self> {
        Arc::new(Self {
            server_name: server_name.to_string(),
            fingerprint: server_fingerprint(server_name),
            state: AtomicU8::new(SupervisorState::Pending.into()),
            client: Mutex::new(None),
            tools: Mutex::new(Vec::new()),
            dispatch_handle: Mutex::new(None),
            addressing,
        })
    }

    pub fn state(&self) -> SupervisorState {
        self.state.load(Ordering::SeqCst).into()
    }

    fn set_state(&self, state: SupervisorState) {
        self.state.store(state.into(), Ordering::SeqCst);
    }

    /// Spawns the subprocess, performs the JSON-RPC handshake, and starts the
    /// dispatch loop. Returns [`EngineError::AlreadyRunning`] if called twice.
    pub async fn start(self: &Arc<Self>, spec: &StartupSpec) -> Result<()> {
        if self.state() == SupervisorState::Running {
            return Err(EngineError::AlreadyRunning(self.server_name.clone()));
        }

        let transport = StdioTransport::spawn(
            &spec.command,
            &spec.args,
            &spec.env,
            spec.timeout_duration(),
        )
        .await?;

        let mut client = ProcessClient::new(self.server_name.clone(), Box::new(transport));

        // Spec §4.4 step 2: Initialize() then ListTools() share one total
        // deadline; a timeout anywhere in the handshake is `Timeout`, any
        // other failure is `InitFailed`. Both transition the handle to Failed.
        let handshake = tokio::time::timeout(spec.timeout_duration(), async {
            client.initialize().await?;
            client.list_tools().await
        })
        .await;

        let tools = match handshake {
            Ok(Ok(tools)) => tools,
            Ok(Err(e)) => {
                self.set_state(SupervisorState::Failed);
                return Err(EngineError::InitFailed(self.server_name.clone(), e.to_string()));
            }
            Err(_) => {
                self.set_state(SupervisorState::Failed);
                return Err(EngineError::timeout(self.server_name.clone(), spec.timeout as u64));
            }
        };

        debug!(
            "server '{}' advertised {} tool(s)",
            self.server_name,
            tools.len()
        );
        *self.tools.lock().await = tools;
        *self.client.lock().await = Some(client);

        let rx = self
            .addressing
            .register(&self.fingerprint, ENDPOINT_CAPACITY)
            .await;

        let this = self.clone();
        let handle = tokio::spawn(async move { this.dispatch_loop(rx).await });
        *self.dispatch_handle.lock().await = Some(handle);

        self.set_state(SupervisorState::Running);
        info!("server '{}' started", self.server_name);
        Ok(())
    }

    async fn dispatch_loop(self: Arc<Self>, mut rx: tokio::sync::mpsc::Receiver<crate::router::RouterFrame>) {
        while let Some(frame) = rx.recv().await {
            let mut client_guard = self.client.lock().await;
            let result = match client_guard.as_mut() {
                Some(client) => client.call_tool(&frame.tool_name, frame.arguments).await,
                None => Err(EngineError::NotRunning(self.server_name.clone())),
            };
            drop(client_guard);

            if frame.reply_to.send(result).is_err() {
                debug!(
                    "caller for server '{}' dropped before reply delivered",
                    self.server_name
                );
            }
        }
        debug!("dispatch loop for server '{}' exited", self.server_name);
    }

    pub async fn call_tool(&self, tool_name: &str, arguments: serde_json::Value) -> Result<serde_json::Value> {
        if self.state() != SupervisorState::Running {
            return Err(EngineError::NotRunning(self.server_name.clone()));
        }
        self.addressing
            .route(&self.fingerprint, tool_name.to_string(), arguments)
            .await
    }

    /// Tools this server advertised during the initialize handshake.
    pub async fn advertised_tools(&self) -> Vec<ToolInfo> {
        self.tools.lock().await.clone()
    }

    pub async fn ping(&self) -> Result<()> {
        let client = self.client.lock().await;
        match client.as_ref() {
            Some(client) => client.ping().await,
            None => Err(EngineError::NotRunning(self.server_name.clone())),
        }
    }

    /// Releases every resource this supervisor acquired, in reverse order:
    /// the dispatch task, the addressing endpoint, then the subprocess
    /// client itself. Errors in any tier are logged, not propagated, so
    /// shutdown always completes (spec §5.3).
    pub async fn shutdown(&self) {
        if let Some(handle) = self.dispatch_handle.lock().await.take() {
            handle.abort();
        }

        self.addressing.deregister(&self.fingerprint).await;

        // Dropping the client drops its transport, which kills the child
        // (`kill_on_drop`) if it hasn't already exited.
        self.client.lock().await.take();

        self.set_state(SupervisorState::Stopped);
        info!("server '{}' stopped", self.server_name);
    }

    pub async fn mark_failed(&self, reason: &str) {
        error!("server '{}' failed: {}", self.server_name, reason);
        self.set_state(SupervisorState::Failed);
    }
}
