use crate::llm::client::{
    backend_error, parse_prompted_tool_calls, render_tool_prompt, LLMClient, LLMResponse,
};
use crate::types::{Result, ToolDefinition};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    Ollama,
};

const DEFAULT_PORT: u16 = 11434;

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    pub async fn new(base_url: String, model: String) -> Result<Self> {
        let (host, port) = parse_base_url(&base_url);
        let client = Ollama::new(host, port);

        Ok(Self { client, model })
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatMessageRequest::new(self.model.clone(), messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| backend_error("Ollama", e))?;

        Ok(response.message.content)
    }
}

/// Split `scheme://host:port` into the `(scheme://host, port)` pair ollama-rs expects.
fn parse_base_url(base_url: &str) -> (String, u16) {
    let url_parts: Vec<&str> = base_url.trim_end_matches('/').split("://").collect();
    if url_parts.len() != 2 {
        return ("http://localhost".to_string(), DEFAULT_PORT);
    }

    let host_port: Vec<&str> = url_parts[1].split(':').collect();
    let host = format!("{}://{}", url_parts[0], host_port[0]);
    let port = if host_port.len() == 2 {
        host_port[1].parse().unwrap_or(DEFAULT_PORT)
    } else {
        DEFAULT_PORT
    };
    (host, port)
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![ChatMessage::user(prompt.to_string())]).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ])
        .await
    }

    async fn generate_with_tools(
        &self,
        prompt: &str,
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        // Native tool calling depends on the pulled model, so tool choice is
        // negotiated through a JSON reply format instead.
        let reply = self.generate(&render_tool_prompt(prompt, tools)).await?;
        if tools.is_empty() {
            return Ok(LLMResponse {
                content: reply,
                tool_calls: vec![],
                finish_reason: "stop".to_string(),
            });
        }
        Ok(parse_prompted_tool_calls(&reply))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
