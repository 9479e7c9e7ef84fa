//! stdio MCP client connection.
//!
//! Each configured server is spawned as a child process at startup and kept
//! until [`ToolConnection::disconnect`] is called, which shuts the session down
//! and reaps the process.

use crate::tools::invoker::{RemoteError, ToolConnection};
use crate::types::{AppError, Result, ToolDefinition};
use crate::utils::toml_config::McpServerConfig;
use async_trait::async_trait;
use rmcp::{
    model::CallToolRequestParam,
    service::{RoleClient, RunningService},
    transport::TokioChildProcess,
    ServiceExt,
};
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::Mutex;

/// A live session with one MCP server.
pub struct McpToolConnection {
    name: String,
    session: Mutex<Option<RunningService<RoleClient, ()>>>,
}

impl McpToolConnection {
    /// Spawn the server described by `config` and complete the MCP handshake.
    pub async fn connect(name: &str, config: &McpServerConfig) -> Result<Self> {
        let mut command = Command::new(&config.command);
        command.args(&config.args);
        for (key, value) in &config.env {
            command.env(key, value);
        }

        let transport = TokioChildProcess::new(command).map_err(|e| {
            AppError::Configuration(format!(
                "failed to spawn MCP server '{}' ({}): {}",
                name, config.command, e
            ))
        })?;

        let session = ().serve(transport).await.map_err(|e| {
            AppError::Internal(format!("MCP handshake with '{}' failed: {}", name, e))
        })?;

        tracing::info!(server = name, command = %config.command, "Connected to MCP server");

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(Some(session)),
        })
    }
}

#[async_trait]
impl ToolConnection for McpToolConnection {
    fn label(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| AppError::Internal(format!("MCP server '{}' is disconnected", self.name)))?;

        let tools = session.list_all_tools().await.map_err(|e| {
            AppError::Internal(format!("listing tools on '{}' failed: {}", self.name, e))
        })?;

        Ok(tools
            .into_iter()
            .map(|tool| ToolDefinition {
                name: tool.name.to_string(),
                description: tool
                    .description
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                parameters: Value::Object(tool.input_schema.as_ref().clone()),
            })
            .collect())
    }

    async fn call(&self, name: &str, args: Value) -> std::result::Result<Value, RemoteError> {
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| RemoteError(format!("MCP server '{}' is disconnected", self.name)))?;

        let arguments = match args {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(RemoteError(format!(
                    "arguments must be a JSON object, got {}",
                    other
                )))
            }
        };

        let result = session
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            })
            .await
            .map_err(|e| RemoteError(e.to_string()))?;

        serde_json::to_value(&result).map_err(|e| RemoteError(e.to_string()))
    }

    async fn disconnect(&self) -> Result<()> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        session
            .cancel()
            .await
            .map_err(|e| AppError::Internal(format!("closing MCP server '{}': {}", self.name, e)))?;
        tracing::info!(server = %self.name, "Disconnected MCP server");
        Ok(())
    }
}
