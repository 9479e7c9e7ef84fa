//! Mock implementations for testing.
//!
//! This module provides mock LLM clients, client factories and tool
//! connections that can be used across different test files without
//! duplication.

use async_trait::async_trait;
use lyceum::llm::{LLMClient, LLMClientFactoryTrait, LLMResponse};
use lyceum::tools::{RemoteError, ToolConnection};
use lyceum::types::{AppError, Result, ToolCall, ToolDefinition};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock LLM client that always gives the same answer (or always fails).
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            response: String::new(),
            should_fail: true,
        }
    }

    fn reply(&self) -> Result<String> {
        if self.should_fail {
            return Err(AppError::BackendUnavailable("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.reply()
    }

    async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
        self.reply()
    }

    async fn generate_with_tools(
        &self,
        _prompt: &str,
        _tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        Ok(LLMResponse {
            content: self.reply()?,
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// One scripted backend answer.
#[derive(Clone, Debug)]
pub enum ScriptedReply {
    Text(String),
    ToolCalls(Vec<ToolCall>),
    Fail(String),
    /// Answer with the text after sleeping
    Slow(Duration, String),
}

impl ScriptedReply {
    pub fn text(text: &str) -> Self {
        ScriptedReply::Text(text.to_string())
    }

    pub fn tool_call(name: &str, arguments: Value) -> Self {
        ScriptedReply::ToolCalls(vec![ToolCall {
            id: format!("call_{}", name),
            name: name.to_string(),
            arguments,
        }])
    }
}

/// LLM client that plays back a queue of replies and records every prompt.
///
/// Once the queue is empty the fallback reply is repeated; without a fallback
/// the client fails with `BackendUnavailable`.
pub struct ScriptedLLMClient {
    model: String,
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLLMClient {
    pub fn new(model: &str, replies: Vec<ScriptedReply>) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            replies: Mutex::new(replies.into()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn with_fallback(model: &str, replies: Vec<ScriptedReply>, fallback: &str) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            replies: Mutex::new(replies.into()),
            fallback: Some(fallback.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Every prompt received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    async fn next(&self, prompt: &str) -> Result<LLMResponse> {
        self.prompts.lock().push(prompt.to_string());
        let reply = self.replies.lock().pop_front();

        let reply = match (reply, &self.fallback) {
            (Some(reply), _) => reply,
            (None, Some(fallback)) => ScriptedReply::Text(fallback.clone()),
            (None, None) => {
                return Err(AppError::BackendUnavailable(format!(
                    "{}: script exhausted",
                    self.model
                )))
            }
        };

        match reply {
            ScriptedReply::Text(content) => Ok(stop(content)),
            ScriptedReply::Slow(delay, content) => {
                tokio::time::sleep(delay).await;
                Ok(stop(content))
            }
            ScriptedReply::Fail(message) => Err(AppError::BackendUnavailable(message)),
            ScriptedReply::ToolCalls(tool_calls) => Ok(LLMResponse {
                content: String::new(),
                tool_calls,
                finish_reason: "tool_calls".to_string(),
            }),
        }
    }
}

fn stop(content: String) -> LLMResponse {
    LLMResponse {
        content,
        tool_calls: vec![],
        finish_reason: "stop".to_string(),
    }
}

#[async_trait]
impl LLMClient for ScriptedLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(self.next(prompt).await?.content)
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    async fn generate_with_tools(
        &self,
        prompt: &str,
        _tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        self.next(prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Client handed out by the factory; shares the script of one model.
struct SharedClient(Arc<ScriptedLLMClient>);

#[async_trait]
impl LLMClient for SharedClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.0.generate(prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.0.generate_with_system(system, prompt).await
    }

    async fn generate_with_tools(
        &self,
        prompt: &str,
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        self.0.generate_with_tools(prompt, tools).await
    }

    fn model_name(&self) -> &str {
        self.0.model_name()
    }
}

type Responder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Stateless client computing each reply from the prompt.
struct ResponderClient {
    model: String,
    respond: Responder,
}

#[async_trait]
impl LLMClient for ResponderClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tokio::task::yield_now().await;
        Ok((self.respond)(prompt))
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    async fn generate_with_tools(
        &self,
        prompt: &str,
        _tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        Ok(stop(self.generate(prompt).await?))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Factory serving scripted or computed clients by model name.
#[derive(Default)]
pub struct MockLLMFactory {
    scripts: HashMap<String, Arc<ScriptedLLMClient>>,
    responders: HashMap<String, Responder>,
    created: AtomicUsize,
}

impl MockLLMFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `client` for its model name. All clients for that model share the script.
    pub fn with_script(mut self, client: Arc<ScriptedLLMClient>) -> Self {
        self.scripts.insert(client.model_name().to_string(), client);
        self
    }

    /// Serve a fresh client for `model` whose replies are computed from each prompt.
    pub fn with_responder<F>(mut self, model: &str, respond: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.responders.insert(model.to_string(), Arc::new(respond));
        self
    }

    /// Number of clients created so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMClientFactoryTrait for MockLLMFactory {
    async fn create_for_model(&self, model: &str) -> Result<Box<dyn LLMClient>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if let Some(script) = self.scripts.get(model) {
            return Ok(Box::new(SharedClient(Arc::clone(script))));
        }
        if let Some(respond) = self.responders.get(model) {
            return Ok(Box::new(ResponderClient {
                model: model.to_string(),
                respond: Arc::clone(respond),
            }));
        }
        Err(AppError::BackendUnavailable(format!(
            "no mock registered for model '{}'",
            model
        )))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

/// How a mock tool answers.
#[derive(Clone, Debug)]
pub enum MockToolBehavior {
    Returns(Value),
    Fails(String),
    /// Sleep, then return the value
    Slow(Duration, Value),
}

/// Tool connection with canned results, call accounting and a concurrency probe.
pub struct MockToolConnection {
    label: String,
    tools: HashMap<String, MockToolBehavior>,
    calls: Mutex<Vec<(String, Value)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    disconnected: AtomicUsize,
}

impl MockToolConnection {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            tools: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            disconnected: AtomicUsize::new(0),
        }
    }

    pub fn with_tool(mut self, name: &str, behavior: MockToolBehavior) -> Self {
        self.tools.insert(name.to_string(), behavior);
        self
    }

    /// `(tool, arguments)` of every call, in order
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// Highest number of calls ever observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolConnection for MockToolConnection {
    fn label(&self) -> &str {
        &self.label
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();
        Ok(names
            .into_iter()
            .map(|name| ToolDefinition {
                name: name.clone(),
                description: format!("mock {}", name),
                parameters: json!({"type": "object", "properties": {}}),
            })
            .collect())
    }

    async fn call(&self, name: &str, args: Value) -> std::result::Result<Value, RemoteError> {
        self.calls.lock().push((name.to_string(), args));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let outcome = match self.tools.get(name) {
            Some(MockToolBehavior::Returns(value)) => Ok(value.clone()),
            Some(MockToolBehavior::Fails(message)) => Err(RemoteError::new(message.clone())),
            Some(MockToolBehavior::Slow(delay, value)) => {
                tokio::time::sleep(*delay).await;
                Ok(value.clone())
            }
            None => Err(RemoteError::new(format!("unknown tool {}", name))),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
