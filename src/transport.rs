//! Transport abstraction for talking JSON-RPC to a tool-server subprocess
//! (spec §4.1, §6). The only implementation is [`crate::process::stdio::StdioTransport`];
//! the trait exists so [`crate::supervisor`] and the indexing pipeline can be
//! tested against a fixture double instead of a real child process.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a JSON-RPC request and waits for its matched response.
    async fn send(&mut self, request: Value) -> Result<Value>;

    /// Sends a JSON-RPC notification; no response is expected.
    async fn send_notification(&mut self, notification: Value) -> Result<()>;

    /// A minimal liveness probe used by the supervisor.
    async fn ping(&self) -> Result<()>;

    fn transport_type(&self) -> &str;
}

pub type BoxedTransport = Box<dyn Transport + Send + Sync>;
