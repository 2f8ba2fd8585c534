//! In-process addressing fabric between callers and per-server supervisors
//! (spec §4.1, §9).
//!
//! The original routes multipart ZeroMQ frames `[caller_id, "", tool_name,
//! args_json]` to a `ROUTER` socket keyed by `server_fingerprint`. Spec §9
//! explicitly allows "an equivalent channel-based dispatcher" in place of a
//! routing socket library, since nothing in this crate's dependency stack
//! brings one in — so each registered endpoint here is a `tokio::mpsc`
//! channel keyed by fingerprint instead of a socket identity.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::error::{EngineError, Result};

/// One call routed to a supervisor: the tool to invoke, its arguments, and a
/// channel back to the caller for the reply.
pub struct RouterFrame {
    pub tool_name: String,
    pub arguments: Value,
    pub reply_to: oneshot::Sender<Result<Value>>,
}

type EndpointSender = mpsc::Sender<RouterFrame>;

/// Registry of live server endpoints, keyed by `server_fingerprint`.
#[derive(Clone, Default)]
pub struct AddressingContext {
    endpoints: Arc<RwLock<HashMap<String, EndpointSender>>>,
}

impl AddressingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new endpoint, returning the receiving half the
    /// supervisor's dispatch loop drains.
    pub async fn register(&self, fingerprint: &str, capacity: usize) -> mpsc::Receiver<RouterFrame> {
        let (tx, rx) = mpsc::channel(capacity);
        self.endpoints
            .write()
            .await
            .insert(fingerprint.to_string(), tx);
        rx
    }

    pub async fn deregister(&self, fingerprint: &str) {
        self.endpoints.write().await.remove(fingerprint);
    }

    /// Routes one call to `fingerprint`'s endpoint and awaits its reply.
    pub async fn route(
        &self,
        fingerprint: &str,
        tool_name: String,
        arguments: Value,
    ) -> Result<Value> {
        let sender = self
            .endpoints
            .read()
            .await
            .get(fingerprint)
            .cloned()
            .ok_or_else(|| EngineError::not_found(fingerprint))?;

        let (reply_to, reply_rx) = oneshot::channel();
        sender
            .send(RouterFrame {
                tool_name,
                arguments,
                reply_to,
            })
            .await
            .map_err(|_| EngineError::NotRunning(fingerprint.to_string()))?;

        reply_rx
            .await
            .map_err(|_| EngineError::NotRunning(fingerprint.to_string()))?
    }

    pub async fn is_registered(&self, fingerprint: &str) -> bool {
        self.endpoints.read().await.contains_key(fingerprint)
    }

    pub async fn len(&self) -> usize {
        self.endpoints.read().await.len()
    }
}
