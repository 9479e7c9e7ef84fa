//! Routing of named tool calls onto live connections.
//!
//! A [`ToolInvoker`] is assembled once at process start from a set of
//! [`ToolConnection`]s. Each connection advertises its tools; the invoker maps
//! every tool name to the connection that serves it and serializes calls per
//! connection, so backends never see two concurrent calls.

use crate::types::{Result, ToolDefinition, ToolError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Error raised by a remote tool call.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct RemoteError(pub String);

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A live connection to something that can execute named tools.
#[async_trait]
pub trait ToolConnection: Send + Sync {
    /// Short label used in logs (`local`, the MCP server name, ...)
    fn label(&self) -> &str;

    /// Tools this connection serves. Called once when the connection is attached.
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>>;

    /// Execute `name` with `args`.
    async fn call(&self, name: &str, args: Value) -> std::result::Result<Value, RemoteError>;

    /// Release the underlying resources.
    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}

struct Route {
    connection: Arc<dyn ToolConnection>,
    gate: Arc<Mutex<()>>,
}

/// Resolves tool names to live connections and normalizes results to text.
pub struct ToolInvoker {
    routes: HashMap<String, Route>,
    definitions: Vec<ToolDefinition>,
    connections: Vec<Arc<dyn ToolConnection>>,
    call_timeout: Option<Duration>,
}

impl Default for ToolInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolInvoker {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            definitions: Vec::new(),
            connections: Vec::new(),
            call_timeout: None,
        }
    }

    /// Bound every call; an elapsed timeout is reported as an execution error.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Attach a connection and route every tool it advertises to it.
    ///
    /// A tool name already served by an earlier connection keeps its first route.
    /// Returns the number of tools newly routed.
    pub async fn attach(&mut self, connection: Arc<dyn ToolConnection>) -> Result<usize> {
        let tools = connection.list_tools().await?;
        let gate = Arc::new(Mutex::new(()));
        let mut added = 0;

        for def in tools {
            if self.routes.contains_key(&def.name) {
                tracing::warn!(
                    tool = %def.name,
                    connection = connection.label(),
                    "Tool already provided by another connection; ignoring duplicate"
                );
                continue;
            }
            self.routes.insert(
                def.name.clone(),
                Route {
                    connection: Arc::clone(&connection),
                    gate: Arc::clone(&gate),
                },
            );
            self.definitions.push(def);
            added += 1;
        }

        tracing::info!(connection = connection.label(), tools = added, "Attached tool connection");
        self.connections.push(connection);
        Ok(added)
    }

    /// Definitions of every routed tool, sorted by name.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs = self.definitions.clone();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Names of every routed tool, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.routes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Invoke `tool_name` and return its result as text.
    ///
    /// No retries are attempted here.
    pub async fn invoke(&self, tool_name: &str, args: Value) -> std::result::Result<String, ToolError> {
        let route = self.routes.get(tool_name).ok_or_else(|| ToolError::Unavailable {
            tool: tool_name.to_string(),
        })?;

        let _in_flight = route.gate.lock().await;
        tracing::debug!(tool = tool_name, connection = route.connection.label(), "Invoking tool");

        let call = route.connection.call(tool_name, args);
        let outcome = match self.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => Err(RemoteError(format!("timed out after {:?}", limit))),
            },
            None => call.await,
        };

        let execution = |cause: String| ToolError::Execution {
            tool: tool_name.to_string(),
            cause,
        };
        let value = outcome.map_err(|e| execution(e.0))?;
        normalize_result(value).map_err(execution)
    }

    /// Disconnect every attached connection, logging failures.
    pub async fn disconnect_all(&self) {
        for connection in &self.connections {
            if let Err(e) = connection.disconnect().await {
                tracing::warn!(connection = connection.label(), error = %e, "Failed to disconnect");
            }
        }
    }
}

/// Collapse the result shapes tools return into a single text form.
///
/// Handles plain strings, MCP-style content envelopes (`{"content": [{"type": "text", "text": ..}]}`,
/// with `isError`), `{"error": ..}` envelopes, and arbitrary structured records, which are
/// rendered as pretty JSON. Error envelopes come back as `Err`.
pub fn normalize_result(value: Value) -> std::result::Result<String, String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Object(map) => {
            if let Some(content) = map.get("content").and_then(|c| c.as_array()) {
                let text = content
                    .iter()
                    .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n");
                let is_error = map.get("isError").and_then(|e| e.as_bool()).unwrap_or(false);
                return if is_error { Err(text) } else { Ok(text) };
            }
            match map.get("error").cloned() {
                Some(Value::Null) | None => {
                    Ok(serde_json::to_string_pretty(&Value::Object(map)).unwrap_or_default())
                }
                Some(Value::String(message)) => Err(message),
                Some(other) => Err(other.to_string()),
            }
        }
        other => Ok(serde_json::to_string_pretty(&other).unwrap_or_default()),
    }
}
