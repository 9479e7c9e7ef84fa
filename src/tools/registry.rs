use crate::tools::invoker::{RemoteError, ToolConnection};
use crate::types::{Result, ToolDefinition};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An in-process tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<Value>;
}

/// A [`ToolConnection`] backed by tools running inside this process.
pub struct LocalToolConnection {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl Default for LocalToolConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalToolConnection {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Create a connection carrying the daedra-powered built-ins that are switched on.
    pub fn with_builtin_tools(web_search: bool, fetch_page: bool, search_results: usize) -> Self {
        let mut connection = Self::new();
        if web_search {
            connection.register(Arc::new(crate::tools::search::SearchTool::new(search_results)));
        }
        if fetch_page {
            connection.register(Arc::new(crate::tools::search::FetchPageTool::new()));
        }
        connection
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolConnection for LocalToolConnection {
    fn label(&self) -> &str {
        "local"
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        Ok(self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect())
    }

    async fn call(&self, name: &str, args: Value) -> std::result::Result<Value, RemoteError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| RemoteError(format!("no local tool named '{}'", name)))?;
        tool.execute(args)
            .await
            .map_err(|e| RemoteError(e.to_string()))
    }
}
