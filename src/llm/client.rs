//! LLM Client abstractions and provider management
//!
//! This module provides a unified interface for the text-generation backend:
//! - **OpenAI**: chat completions with native tool calling
//! - **Ollama**: local inference; tool selection is negotiated through a JSON prompt

use crate::types::{AppError, Result, ToolCall, ToolDefinition};
use crate::utils::toml_config::ProviderConfig;
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing the agents.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate with tool calling support
    async fn generate_with_tools(
        &self,
        prompt: &str,
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Response from an LLM generation request
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// The text content of the response
    pub content: String,
    /// Any tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// The reason generation stopped (e.g., "stop", "tool_calls", "length")
    pub finish_reason: String,
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including compatible APIs)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4o-mini".to_string(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Ollama local LLM provider
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.2".to_string(),
    /// };
    /// ```
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the provider's cargo feature is disabled.
    pub async fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Ok(Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            ))),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone()).await?,
            )),

            #[allow(unreachable_patterns)]
            other => Err(AppError::Configuration(format!(
                "{} provider support is not compiled in (enable the '{}' feature)",
                other.name(),
                other.name().to_lowercase()
            ))),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    /// The model this provider will be asked for
    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}

/// Creates backend clients for a model identifier.
///
/// The engine asks for one client per role per run, so concurrent runs never
/// share a client instance.
#[async_trait]
pub trait LLMClientFactoryTrait: Send + Sync {
    /// Create a client bound to `model`
    async fn create_for_model(&self, model: &str) -> Result<Box<dyn LLMClient>>;

    /// Name of the backing provider, for diagnostics
    fn provider_name(&self) -> &str;
}

/// Configuration-based client factory
///
/// Holds the provider connection settings and stamps out a [`Provider`] per
/// requested model.
pub struct LLMClientFactory {
    config: ProviderConfig,
}

impl LLMClientFactory {
    /// Create a new factory from provider configuration
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    /// Build the provider description for a given model
    pub fn provider_for(&self, model: &str) -> Result<Provider> {
        match &self.config {
            ProviderConfig::Ollama { base_url } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.to_string(),
            }),
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
            } => {
                let api_key = std::env::var(api_key_env).map_err(|_| {
                    AppError::Configuration(format!(
                        "environment variable '{}' is not set",
                        api_key_env
                    ))
                })?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                    model: model.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl LLMClientFactoryTrait for LLMClientFactory {
    async fn create_for_model(&self, model: &str) -> Result<Box<dyn LLMClient>> {
        self.provider_for(model)?.create_client().await
    }

    fn provider_name(&self) -> &str {
        match self.config {
            ProviderConfig::Ollama { .. } => "Ollama",
            ProviderConfig::OpenAI { .. } => "OpenAI",
        }
    }
}

/// Map a raw provider error message onto the backend error taxonomy.
pub(crate) fn backend_error(provider: &str, message: impl std::fmt::Display) -> AppError {
    let message = message.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("429") || lowered.contains("rate limit") || lowered.contains("rate_limit")
    {
        AppError::BackendRateLimited(format!("{}: {}", provider, message))
    } else {
        AppError::BackendUnavailable(format!("{}: {}", provider, message))
    }
}

/// Render a prompt that asks a model without native tool calling to pick tools.
///
/// The model must answer with either `{"tool_calls": [{"name": .., "arguments": {..}}]}`
/// or plain text when it is done.
pub fn render_tool_prompt(prompt: &str, tools: &[ToolDefinition]) -> String {
    if tools.is_empty() {
        return prompt.to_string();
    }

    let catalogue = tools
        .iter()
        .map(|t| format!("- {}: {}\n  parameters: {}", t.name, t.description, t.parameters))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"{prompt}

You may call these tools:
{catalogue}

To call tools, reply with ONLY a JSON object:
{{"tool_calls": [{{"name": "<tool>", "arguments": {{ ... }}}}]}}
When you have enough information, reply with your final answer as plain text."#
    )
}

/// Parse the reply to a prompt built by [`render_tool_prompt`].
pub fn parse_prompted_tool_calls(reply: &str) -> LLMResponse {
    let cleaned = crate::utils::strip_code_fence(reply);
    let calls = serde_json::from_str::<serde_json::Value>(cleaned)
        .ok()
        .and_then(|v| v.get("tool_calls").and_then(|c| c.as_array()).cloned());

    match calls {
        Some(calls) if !calls.is_empty() => {
            let tool_calls = calls
                .iter()
                .enumerate()
                .filter_map(|(i, call)| {
                    let name = call.get("name")?.as_str()?.to_string();
                    Some(ToolCall {
                        id: format!("call_{}", i),
                        name,
                        arguments: call
                            .get("arguments")
                            .cloned()
                            .unwrap_or_else(|| serde_json::json!({})),
                    })
                })
                .collect();
            LLMResponse {
                content: String::new(),
                tool_calls,
                finish_reason: "tool_calls".to_string(),
            }
        }
        _ => LLMResponse {
            content: reply.trim().to_string(),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
        },
    }
}
