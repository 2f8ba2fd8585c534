//! End-to-end lifecycle scenarios against a real stdio subprocess fixture
//! (spec §8, scenarios 3, 4, 6), plus `Start`/`Shutdown` idempotency.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{mock_failing_server_path, mock_tool_server_path, ConstantEmbedder, StubDescriber};
use mcp_router_engine::config::McpConfig;
use mcp_router_engine::index::memory::InMemoryIndex;
use mcp_router_engine::queue::TaskOutcome;
use mcp_router_engine::settings::EngineSettings;
use mcp_router_engine::{Engine, EngineError};

fn engine_with_server(name: &str, command: &str, args: Vec<&str>) -> Engine {
    let mut config = McpConfig::default();
    config.mcp_servers.insert(name.to_string(), common::spec_for(command, args));

    Engine::new(
        config,
        EngineSettings::default(),
        Arc::new(InMemoryIndex::new()),
        Arc::new(StubDescriber {
            tools: vec![],
            fail_enhance_for: vec![],
        }),
        Arc::new(ConstantEmbedder { dimensions: 4 }),
    )
}

#[tokio::test]
async fn scenario_3_synchronous_execute() {
    let engine = engine_with_server("fs", mock_tool_server_path(), vec![]);
    engine.enter().await;

    engine.start_server("fs").await.unwrap();
    assert_eq!(engine.list_running().await, vec!["fs".to_string()]);

    let result = engine
        .execute("fs", "echo", serde_json::json!({"path": "/a"}), None)
        .await
        .unwrap();

    let content = result["content"].as_array().unwrap();
    assert_eq!(content.len(), 1);
    // `annotations` must be stripped from the content block (spec §4.1 step 4).
    assert!(content[0].get("annotations").is_none());
    assert_eq!(content[0]["type"], "text");

    engine.shutdown().await;
}

#[tokio::test]
async fn scenario_4_background_execute_and_poll() {
    let engine = engine_with_server("fs", mock_tool_server_path(), vec![]);
    engine.enter().await;
    engine.start_server("fs").await.unwrap();

    let handle = engine
        .execute_background("fs", "slow", serde_json::json!({}), Some(2), None)
        .await
        .unwrap();

    match engine.poll(handle).await.unwrap() {
        TaskOutcome::Running => {}
        TaskOutcome::Completed(_) => {
            // Extremely unlikely given the fixture's 300ms sleep, but not a
            // correctness violation if the scheduler was slow to start it.
        }
    }

    let outcome = loop {
        match engine.poll(handle).await.unwrap() {
            TaskOutcome::Completed(outcome) => break outcome,
            TaskOutcome::Running => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    };
    assert!(outcome.is_ok());

    // Polling is destructive: a second poll after completion is observed
    // must report the task unknown.
    let err = engine.poll(handle).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    engine.shutdown().await;
}

#[tokio::test]
async fn tool_error_surfaces_without_killing_supervisor() {
    let engine = engine_with_server("fs", mock_tool_server_path(), vec![]);
    engine.enter().await;
    engine.start_server("fs").await.unwrap();

    let err = engine
        .execute("fs", "fail", serde_json::json!({}), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ToolError { .. }));

    // The supervisor must survive a tool-level error (spec §7 policy).
    assert_eq!(engine.list_running().await, vec!["fs".to_string()]);
    let ok = engine.execute("fs", "echo", serde_json::json!({}), None).await;
    assert!(ok.is_ok());

    engine.shutdown().await;
}

#[tokio::test]
async fn start_is_idempotent_and_shutdown_on_unknown_server_is_not_found() {
    let engine = engine_with_server("fs", mock_tool_server_path(), vec![]);
    engine.enter().await;

    engine.start_server("fs").await.unwrap();
    let second = engine.start_server("fs").await;
    assert!(matches!(second, Err(EngineError::AlreadyRunning(_))));

    let not_running = engine.shutdown_server("ghost").await;
    assert!(matches!(not_running, Err(EngineError::NotFound(_))));

    engine.shutdown().await;
}

#[tokio::test]
async fn failing_subprocess_marks_start_failed() {
    let engine = engine_with_server("broken", mock_failing_server_path(), vec![]);
    engine.enter().await;

    let err = engine.start_server("broken").await.unwrap_err();
    assert!(matches!(err, EngineError::InitFailed(..) | EngineError::IOError(_)));
    assert!(engine.list_running().await.is_empty());

    engine.shutdown().await;
}

#[tokio::test]
async fn execute_on_not_running_server_is_not_running() {
    let engine = engine_with_server("fs", mock_tool_server_path(), vec![]);
    engine.enter().await;

    let err = engine
        .execute("fs", "echo", serde_json::json!({}), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotRunning(_)));

    engine.shutdown().await;
}

/// Scenario 6: shutdown tears down a running supervisor and any in-flight
/// background task without hanging, and leaves the engine in a state where
/// the server can be started again cleanly.
#[tokio::test]
async fn scenario_6_shutdown_with_live_supervisor_and_background_task() {
    let engine = engine_with_server("fs", mock_tool_server_path(), vec![]);
    engine.enter().await;
    engine.start_server("fs").await.unwrap();

    let _in_flight = engine
        .execute_background("fs", "slow", serde_json::json!({}), Some(1), None)
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), engine.shutdown())
        .await
        .expect("shutdown must complete promptly even with live work");

    assert!(engine.list_running().await.is_empty());
}
