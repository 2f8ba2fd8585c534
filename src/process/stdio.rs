//! Stdio subprocess [`Transport`]: newline-delimited JSON-RPC over a spawned
//! child's stdin/stdout.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, Command};

use crate::error::{EngineError, Result};
use crate::transport::Transport;

pub struct StdioTransport {
    child: Child,
    stdin: ChildStdin,
    stdout_lines: Lines<BufReader<tokio::process::ChildStdout>>,
    timeout: Duration,
}

impl StdioTransport {
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| EngineError::InitFailed(command.to_string(), e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::InitFailed(command.to_string(), "no stdin handle".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::InitFailed(command.to_string(), "no stdout handle".into()))?;

        Ok(Self {
            child,
            stdin,
            stdout_lines: BufReader::new(stdout).lines(),
            timeout,
        })
    }

    async fn read_response_line(&mut self) -> Result<Value> {
        let line = tokio::time::timeout(self.timeout, self.stdout_lines.next_line())
            .await
            .map_err(|_| EngineError::timeout("subprocess", self.timeout.as_secs()))?
            .map_err(EngineError::IOError)?
            .ok_or_else(|| EngineError::Protocol("subprocess closed stdout".into()))?;

        serde_json::from_str(&line)
            .map_err(|e| EngineError::Protocol(format!("malformed JSON-RPC line: {e}")))
    }

    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&mut self, request: Value) -> Result<Value> {
        let mut line = serde_json::to_string(&request)
            .map_err(|e| EngineError::Protocol(format!("failed to encode request: {e}")))?;
        line.push('\n');

        tokio::time::timeout(self.timeout, async {
            self.stdin.write_all(line.as_bytes()).await?;
            self.stdin.flush().await
        })
        .await
        .map_err(|_| EngineError::timeout("subprocess", self.timeout.as_secs()))?
        .map_err(EngineError::IOError)?;

        self.read_response_line().await
    }

    async fn send_notification(&mut self, notification: Value) -> Result<()> {
        let mut line = serde_json::to_string(&notification)
            .map_err(|e| EngineError::Protocol(format!("failed to encode notification: {e}")))?;
        line.push('\n');

        tokio::time::timeout(self.timeout, async {
            self.stdin.write_all(line.as_bytes()).await?;
            self.stdin.flush().await
        })
        .await
        .map_err(|_| EngineError::timeout("subprocess", self.timeout.as_secs()))?
        .map_err(EngineError::IOError)?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn transport_type(&self) -> &str {
        "stdio"
    }
}
