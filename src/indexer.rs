//! The indexing pipeline: `IndexAll`/`IndexOne` (spec §4.2, §4.3).
//!
//! `IndexAll` fans servers out through a `Semaphore`-gated `buffer_unordered`
//! stream (one independent semaphore for server describing, a second for
//! tool enhance+embed, since the original rate-limits those two phases
//! separately: `MCP_SERVER_INDEX_RATE_LIMIT` vs `MCP_SERVER_TOOL_INDEX_RATE_LIMIT`).
//! Per-server tool indexing cannot use the same bounded-combinator shape,
//! though: every tool task rendezvous at a [`crate::barrier::BreakableBarrier`]
//! of exactly `k` parties (`k` = the server's tool count), and a barrier only
//! releases once all `k` have called `wait`. `buffer_unordered(N)` only polls
//! up to `N` futures at a time, so for `k > N` the tasks beyond the Nth slot
//! would never even start, and the first `N` would block at the barrier
//! forever waiting for siblings that were never polled. Each tool task is
//! therefore `tokio::spawn`ed independently so all `k` are alive and able to
//! reach the barrier, with `tool_semaphore` (acquired inside `index_tool`)
//! as the only concurrency cap.

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::barrier::BreakableBarrier;
use crate::config::{McpConfig, StartupSpec};
use crate::descriptor::Describer;
use crate::embedding::{blend, Embedder};
use crate::error::{EngineError, Result};
use crate::fingerprint::{point_id, server_fingerprint, tool_fingerprint};
use crate::index::{ServerRecord, ToolRecord, VectorIndex};
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::settings::EngineSettings;

/// Collaborators and rate limits the indexing pipeline needs, bundled so
/// callers don't have to thread five parameters through every function.
pub struct IndexContext {
    pub index: Arc<dyn VectorIndex>,
    pub describer: Arc<dyn Describer>,
    pub embedder: Arc<dyn Embedder>,
    pub settings: EngineSettings,
    server_semaphore: Arc<Semaphore>,
    tool_semaphore: Arc<Semaphore>,
    retry_config: RetryConfig,
}

impl IndexContext {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        describer: Arc<dyn Describer>,
        embedder: Arc<dyn Embedder>,
        settings: EngineSettings,
    ) -> Self {
        let server_semaphore = Arc::new(Semaphore::new(settings.server_index_rate_limit));
        let tool_semaphore = Arc::new(Semaphore::new(settings.tool_index_rate_limit));
        Self {
            index,
            describer,
            embedder,
            settings,
            server_semaphore,
            tool_semaphore,
            retry_config: RetryConfig::default(),
        }
    }
}

/// Indexes every server named in `config`, honoring each server's
/// `force_reindex` flag, up to `server_index_rate_limit` concurrently.
///
/// Returns the names of servers that indexed successfully. If every server
/// fails, returns [`EngineError::AllFailed`] (spec §7).
pub async fn index_all(ctx: &IndexContext, config: &McpConfig) -> Result<Vec<String>> {
    let names = config.names();
    let total = names.len();

    let results: Vec<(String, Result<()>)> = stream::iter(names)
        .map(|name| {
            let spec = config.get(&name).cloned();
            async move {
                let outcome = match spec {
                    Some(spec) => index_one(ctx, &name, &spec).await,
                    None => Err(EngineError::not_found(name.clone())),
                };
                (name, outcome)
            }
        })
        .buffer_unordered(ctx.settings.server_index_rate_limit.max(1))
        .collect()
        .await;

    let mut succeeded = Vec::new();
    for (name, outcome) in results {
        match outcome {
            Ok(()) => succeeded.push(name),
            Err(e) => warn!("server '{}' failed to index: {}", name, e),
        }
    }

    if succeeded.is_empty() && total > 0 {
        return Err(EngineError::AllFailed(total));
    }

    Ok(succeeded)
}

/// Indexes a single server: describe, then fan out tool enhance+embed under
/// a breakable barrier so either every tool commits or none do.
pub async fn index_one(ctx: &IndexContext, server_name: &str, spec: &StartupSpec) -> Result<()> {
    if !spec.force_reindex {
        if ctx.index.get_server(server_name).await?.is_some() {
            debug!("server '{}' already indexed, skipping", server_name);
            return Ok(());
        }
    }

    let _permit = ctx
        .server_semaphore
        .acquire()
        .await
        .map_err(|_| EngineError::InitFailed(server_name.to_string(), "semaphore closed".into()))?;

    let timeout = spec.timeout_duration();
    let bundle = retry_with_backoff(
        || ctx.describer.describe_server(server_name, spec, timeout),
        &ctx.retry_config,
    )
    .await?;

    let server_text = bundle.description.embedding_text();
    let server_base_vec = retry_with_backoff(
        || ctx.embedder.embed(std::slice::from_ref(&server_text)),
        &ctx.retry_config,
    )
    .await?
    .into_iter()
    .next()
    .ok_or_else(|| EngineError::Protocol("embedder returned no vectors".into()))?;

    if bundle.tools.is_empty() {
        ctx.index
            .add_server(ServerRecord {
                point_id: point_id(server_name),
                server_name: server_name.to_string(),
                fingerprint: server_fingerprint(server_name),
                title: bundle.description.title.clone(),
                summary: bundle.description.summary.clone(),
                capabilities: bundle.description.capabilities.clone(),
                limitations: bundle.description.limitations.clone(),
                nb_tools: 0,
                vector: server_base_vec,
            })
            .await?;
        info!("indexed server '{}' with 0 tools", server_name);
        return Ok(());
    }

    let barrier = BreakableBarrier::new(bundle.tools.len());
    let alpha = ctx.settings.embedding_weight_alpha;

    let mut handles = Vec::with_capacity(bundle.tools.len());
    for tool in bundle.tools.iter().cloned() {
        let barrier = barrier.clone();
        let base_vec = server_base_vec.clone();
        let describer = ctx.describer.clone();
        let embedder = ctx.embedder.clone();
        let tool_semaphore = ctx.tool_semaphore.clone();
        let retry_config = ctx.retry_config.clone();
        let server_name = server_name.to_string();

        handles.push(tokio::spawn(async move {
            let outcome = index_tool(
                &describer,
                &embedder,
                &tool_semaphore,
                &retry_config,
                &server_name,
                &tool,
                &base_vec,
                alpha,
            )
            .await;
            if outcome.is_err() {
                barrier.r#break();
            }
            barrier.wait().await;
            outcome
        }));
    }

    let mut tool_results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(outcome) => tool_results.push(outcome),
            Err(join_error) => {
                barrier.r#break();
                tool_results.push(Err(EngineError::ToolIndexingAborted(
                    server_name.to_string(),
                    format!("tool indexing task failed to join: {join_error}"),
                )));
            }
        }
    }

    if barrier.is_broken() {
        let first_error = tool_results
            .into_iter()
            .find_map(|r| r.err())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "a sibling tool failed to index".to_string());
        return Err(EngineError::ToolIndexingAborted(
            server_name.to_string(),
            first_error,
        ));
    }

    ctx.index
        .add_server(ServerRecord {
            point_id: point_id(server_name),
            server_name: server_name.to_string(),
            fingerprint: server_fingerprint(server_name),
            title: bundle.description.title.clone(),
            summary: bundle.description.summary.clone(),
            capabilities: bundle.description.capabilities.clone(),
            limitations: bundle.description.limitations.clone(),
            nb_tools: tool_results.len(),
            vector: server_base_vec,
        })
        .await?;

    for record in tool_results.into_iter().flatten() {
        ctx.index.add_tool(record).await?;
    }

    info!(
        "indexed server '{}' with {} tool(s)",
        server_name,
        bundle.tools.len()
    );
    Ok(())
}

/// Enhances, embeds, and blends one tool's vector. Takes its collaborators as
/// owned `Arc`s/clones rather than `&IndexContext` so each call can run
/// inside its own `tokio::spawn`ed task, independent of `index_one`'s stack
/// frame (see the module-level doc comment for why a bounded combinator
/// can't be used here).
#[allow(clippy::too_many_arguments)]
async fn index_tool(
    describer: &Arc<dyn Describer>,
    embedder: &Arc<dyn Embedder>,
    tool_semaphore: &Arc<Semaphore>,
    retry_config: &RetryConfig,
    server_name: &str,
    tool: &crate::descriptor::RawTool,
    server_base_vec: &[f32],
    alpha: f32,
) -> Result<ToolRecord> {
    let _permit = tool_semaphore
        .acquire()
        .await
        .map_err(|_| EngineError::InitFailed(server_name.to_string(), "semaphore closed".into()))?;

    let enhanced = retry_with_backoff(
        || describer.enhance_tool(server_name, &tool.name, &tool.description, &tool.schema),
        retry_config,
    )
    .await?;

    let tool_vec = retry_with_backoff(
        || embedder.embed(std::slice::from_ref(&enhanced)),
        retry_config,
    )
    .await?
    .into_iter()
    .next()
    .ok_or_else(|| EngineError::Protocol("embedder returned no vectors".into()))?;

    let blended = blend(server_base_vec, &tool_vec, alpha)?;

    Ok(ToolRecord {
        point_id: point_id(&crate::fingerprint::tool_key(server_name, &tool.name)),
        server_name: server_name.to_string(),
        tool_name: tool.name.clone(),
        fingerprint: tool_fingerprint(server_name, &tool.name),
        description: tool.description.clone(),
        enhanced_description: enhanced,
        schema: tool.schema.clone(),
        vector: blended,
    })
}
