//! Thin CLI front-end for the router engine, ambient and not part of the
//! core's tested surface.
//!
//! Loads config and settings, builds an [`Engine`], and either indexes the
//! configured fleet or serves newline-delimited JSON commands on stdin until
//! EOF, tearing the engine down in order on exit.
//!
//! The LLM descriptor/enhancer and embedding provider are external
//! collaborators (spec §1); this binary wires in deterministic local
//! stand-ins ([`LocalDescriber`], [`HashEmbedder`]) so `index` is runnable
//! without a network call. A real deployment swaps these for a collaborator
//! that calls out to an LLM and an embedding API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use mcp_router_engine::config::{loader, StartupSpec};
use mcp_router_engine::descriptor::{Describer, FullServerBundle, RawTool, ServerDescription};
use mcp_router_engine::embedding::Embedder;
use mcp_router_engine::index::memory::InMemoryIndex;
use mcp_router_engine::queue::TaskOutcome;
use mcp_router_engine::settings::EngineSettings;
use mcp_router_engine::{EngineError, Engine};

#[derive(Parser)]
#[command(name = "router-daemon", about = "Semantic tool-server router engine")]
struct Cli {
    /// Path to the mcp_servers.json config file; falls back to the standard search order.
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index every configured server into the vector store.
    Index,
    /// Start every configured server, serve JSON commands on stdin, then shut down on EOF.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = loader::find_and_load(cli.config.as_deref())
        .await
        .context("loading mcp_servers.json")?;
    let settings = EngineSettings::from_env();

    let index = Arc::new(InMemoryIndex::new());
    let describer: Arc<dyn Describer> = Arc::new(LocalDescriber);
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder {
        dimensions: settings.embedding_dimensions,
    });

    let engine = Engine::new(config, settings, index, describer, embedder);
    engine.enter().await;

    let result = match cli.command {
        Command::Index => run_index(&engine).await,
        Command::Serve => run_serve(&engine).await,
    };

    engine.shutdown().await;
    result
}

async fn run_index(engine: &Engine) -> Result<()> {
    match engine.index_all().await {
        Ok(succeeded) => {
            println!("{}", json!({"indexed": succeeded}));
            Ok(())
        }
        Err(e) => {
            eprintln!("indexing failed: {e}");
            std::process::exit(mcp_router_engine::exit_code(&e));
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum StdinCommand {
    Start { server: String },
    Shutdown { server: String },
    Execute {
        server: String,
        tool: String,
        #[serde(default)]
        arguments: Value,
        #[serde(default)]
        timeout_secs: Option<f64>,
        #[serde(default)]
        background: bool,
        #[serde(default)]
        priority: Option<i32>,
    },
    Poll { task_id: String },
    ListRunning,
}

/// Reads one JSON command per line from stdin and writes one JSON reply per
/// line to stdout, until EOF. This is the ambient transport stand-in for the
/// spec's externalized "CLI/transport front-end".
async fn run_serve(engine: &Engine) -> Result<()> {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<StdinCommand>(&line) {
            Ok(cmd) => dispatch(engine, cmd).await,
            Err(e) => json!({"error": format!("invalid command: {e}")}),
        };
        let mut out = serde_json::to_string(&reply)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

async fn dispatch(engine: &Engine, cmd: StdinCommand) -> Value {
    match cmd {
        StdinCommand::Start { server } => match engine.start_server(&server).await {
            Ok(()) => json!({"ok": true, "message": format!("server '{server}' started")}),
            Err(EngineError::AlreadyRunning(_)) => {
                json!({"ok": true, "message": format!("server '{server}' already running")})
            }
            Err(e) => json!({"ok": false, "error": e.to_string()}),
        },
        StdinCommand::Shutdown { server } => match engine.shutdown_server(&server).await {
            Ok(()) => json!({"ok": true, "message": format!("server '{server}' stopped")}),
            Err(EngineError::NotFound(_)) => {
                json!({"ok": true, "message": format!("server '{server}' not running")})
            }
            Err(e) => json!({"ok": false, "error": e.to_string()}),
        },
        StdinCommand::Execute {
            server,
            tool,
            arguments,
            timeout_secs,
            background,
            priority,
        } => {
            let timeout = timeout_secs.map(Duration::from_secs_f64);
            if background {
                match engine
                    .execute_background(&server, &tool, arguments, priority, timeout)
                    .await
                {
                    Ok(handle) => json!({
                        "ok": true,
                        "task_id": handle.0.to_string(),
                        "message": "tool scheduled; poll with {\"op\":\"poll\",\"task_id\":\"...\"}",
                    }),
                    Err(e) => json!({"ok": false, "error": e.to_string()}),
                }
            } else {
                match engine.execute(&server, &tool, arguments, timeout).await {
                    Ok(content) => json!({"ok": true, "content": content}),
                    Err(e) => json!({"ok": false, "error": e.to_string()}),
                }
            }
        }
        StdinCommand::Poll { task_id } => {
            let Ok(uuid) = task_id.parse() else {
                return json!({"ok": false, "error": format!("invalid task id '{task_id}'")});
            };
            match engine.poll(mcp_router_engine::queue::TaskHandle(uuid)).await {
                Ok(TaskOutcome::Running) => json!({"done": false, "error": "still running"}),
                Ok(TaskOutcome::Completed(Ok(content))) => json!({"done": true, "content": content}),
                Ok(TaskOutcome::Completed(Err(message))) => json!({"done": false, "error": message}),
                Err(e) => json!({"done": false, "error": e.to_string()}),
            }
        }
        StdinCommand::ListRunning => json!({"running": engine.list_running().await}),
    }
}

/// Deterministic local stand-in for the LLM descriptor/enhancer collaborator:
/// summarizes a server from its startup spec instead of calling out to a model.
struct LocalDescriber;

#[async_trait]
impl Describer for LocalDescriber {
    async fn describe_server(
        &self,
        server_name: &str,
        spec: &StartupSpec,
        _timeout: Duration,
    ) -> mcp_router_engine::Result<FullServerBundle> {
        Ok(FullServerBundle {
            server_name: server_name.to_string(),
            description: ServerDescription {
                title: server_name.to_string(),
                summary: format!("Tool server launched via `{}`", spec.command),
                capabilities: vec!["tool-execution".to_string()],
                limitations: vec!["description generated without an LLM".to_string()],
            },
            tools: vec![RawTool {
                name: "default".to_string(),
                description: "placeholder tool; replace with the server's real tool list".to_string(),
                schema: json!({"type": "object"}),
            }],
        })
    }

    async fn enhance_tool(
        &self,
        _server_name: &str,
        _tool_name: &str,
        description: &str,
        _schema: &Value,
    ) -> mcp_router_engine::Result<String> {
        Ok(description.to_string())
    }
}

/// Deterministic local stand-in for the embedding provider: hashes text into
/// a fixed-width pseudo-embedding so indexing is exercisable offline.
struct HashEmbedder {
    dimensions: usize,
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> mcp_router_engine::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_vector(t, self.dimensions)).collect())
    }
}

fn hash_vector(text: &str, dimensions: usize) -> Vec<f32> {
    let mut vector = Vec::with_capacity(dimensions);
    let mut counter: u32 = 0;
    while vector.len() < dimensions {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(counter.to_le_bytes());
        let digest = hasher.finalize();
        for chunk in digest.chunks(4) {
            if vector.len() >= dimensions {
                break;
            }
            let mut bytes = [0u8; 4];
            bytes[..chunk.len()].copy_from_slice(chunk);
            let n = u32::from_le_bytes(bytes);
            vector.push((n as f32 / u32::MAX as f32) * 2.0 - 1.0);
        }
        counter += 1;
    }
    vector
}
