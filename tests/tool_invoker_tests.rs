//! Integration tests for tool routing
//!
//! These tests attach several connections to one invoker and check:
//! - routing by tool name across connections
//! - result normalization for heterogeneous shapes
//! - one call in flight per connection under concurrent use
//! - disconnect lifecycle

mod common;

use common::mocks::{MockToolBehavior, MockToolConnection};
use lyceum::tools::{LocalToolConnection, ToolInvoker};
use lyceum::types::ToolError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn papers() -> Arc<MockToolConnection> {
    Arc::new(
        MockToolConnection::new("papers")
            .with_tool(
                "arxiv_search",
                MockToolBehavior::Returns(json!({
                    "content": [
                        {"type": "text", "text": "Attention Is All You Need"},
                        {"type": "text", "text": "Graph Attention Networks"}
                    ]
                })),
            )
            .with_tool(
                "slow_lookup",
                MockToolBehavior::Slow(Duration::from_millis(30), json!("done")),
            ),
    )
}

fn encyclopedia() -> Arc<MockToolConnection> {
    Arc::new(
        MockToolConnection::new("encyclopedia")
            .with_tool(
                "wikipedia_search",
                MockToolBehavior::Returns(json!({"title": "Graph", "extract": "A graph is..."})),
            )
            .with_tool(
                "wikipedia_page",
                MockToolBehavior::Returns(json!({"error": "page not found"})),
            ),
    )
}

#[tokio::test]
async fn test_routes_each_tool_to_its_connection() {
    let papers = papers();
    let encyclopedia = encyclopedia();
    let mut invoker = ToolInvoker::new();
    assert_eq!(invoker.attach(papers.clone()).await.unwrap(), 2);
    assert_eq!(invoker.attach(encyclopedia.clone()).await.unwrap(), 2);

    assert_eq!(
        invoker.tool_names(),
        vec!["arxiv_search", "slow_lookup", "wikipedia_page", "wikipedia_search"]
    );

    let text = invoker
        .invoke("arxiv_search", json!({"topic": "attention"}))
        .await
        .unwrap();
    assert_eq!(text, "Attention Is All You Need\nGraph Attention Networks");

    let record = invoker
        .invoke("wikipedia_search", json!({"topic": "graph"}))
        .await
        .unwrap();
    assert!(record.contains("\"extract\": \"A graph is...\""));

    assert_eq!(papers.calls().len(), 1);
    assert_eq!(encyclopedia.calls().len(), 1);
    assert_eq!(encyclopedia.calls()[0].1["topic"], "graph");
}

#[tokio::test]
async fn test_error_envelope_is_execution_error() {
    let mut invoker = ToolInvoker::new();
    invoker.attach(encyclopedia()).await.unwrap();

    match invoker.invoke("wikipedia_page", json!({})).await {
        Err(ToolError::Execution { tool, cause }) => {
            assert_eq!(tool, "wikipedia_page");
            assert_eq!(cause, "page not found");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_tool_is_unavailable() {
    let mut invoker = ToolInvoker::new();
    invoker.attach(papers()).await.unwrap();

    assert!(matches!(
        invoker.invoke("wikipedia_search", json!({})).await,
        Err(ToolError::Unavailable { tool }) if tool == "wikipedia_search"
    ));
}

#[tokio::test]
async fn test_concurrent_callers_share_connection_one_at_a_time() {
    let papers = papers();
    let mut invoker = ToolInvoker::new();
    invoker.attach(papers.clone()).await.unwrap();
    let invoker = Arc::new(invoker);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let invoker = Arc::clone(&invoker);
            tokio::spawn(async move { invoker.invoke("slow_lookup", json!({"n": i})).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "done");
    }

    assert_eq!(papers.calls().len(), 4);
    assert_eq!(papers.max_in_flight(), 1);
}

#[tokio::test]
async fn test_disconnect_all_releases_every_connection() {
    let papers = papers();
    let encyclopedia = encyclopedia();
    let mut invoker = ToolInvoker::new();
    invoker.attach(papers.clone()).await.unwrap();
    invoker.attach(encyclopedia.clone()).await.unwrap();

    invoker.disconnect_all().await;

    assert_eq!(papers.disconnect_count(), 1);
    assert_eq!(encyclopedia.disconnect_count(), 1);
}

#[tokio::test]
async fn test_builtin_tools_attach_without_network() {
    let mut invoker = ToolInvoker::new();
    let local = LocalToolConnection::with_builtin_tools(true, true, 5);
    assert_eq!(invoker.attach(Arc::new(local)).await.unwrap(), 2);

    assert!(invoker.has_tool("web_search"));
    assert!(invoker.has_tool("fetch_page"));
    for def in invoker.tool_definitions() {
        assert_eq!(def.parameters["type"], "object");
        assert!(!def.description.is_empty());
    }
}
