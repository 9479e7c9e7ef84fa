//! Researcher: gathers material through the tool invoker.
//!
//! The backend chooses which tools to call. Every tool problem (unknown tool,
//! remote failure, empty result) is written into the step output as a note
//! instead of failing the step.

use crate::agents::Agent;
use crate::llm::LLMClient;
use crate::memory::Context;
use crate::tools::ToolInvoker;
use crate::types::{AgentExecutionError, Step, ToolCall, ToolError};
use crate::utils::toml_config::ResearchConfig;
use crate::utils::truncate_chars;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Search tools that receive the run topic when the model leaves it out,
/// paired with the argument it goes into.
const TOPIC_ARGUMENTS: [(&str, &str); 3] = [
    ("web_search", "query"),
    ("arxiv_search", "topic"),
    ("wikipedia_search", "topic"),
];

pub struct ResearcherAgent {
    llm: Box<dyn LLMClient>,
    tools: Arc<ToolInvoker>,
    config: ResearchConfig,
}

impl ResearcherAgent {
    pub fn new(llm: Box<dyn LLMClient>, tools: Arc<ToolInvoker>, config: ResearchConfig) -> Self {
        Self { llm, tools, config }
    }

    fn build_prompt(&self, step: &Step, context: &Context) -> String {
        let today = chrono::Utc::now().format("%Y-%m-%d");
        let tools = self.tools.tool_names();
        let tool_list = if tools.is_empty() {
            "(none connected)".to_string()
        } else {
            tools.join(", ")
        };

        let mut prompt = format!(
            "{}\n\nToday is {}.\nResearch topic: {}\nAvailable tools: {}\n\nYour task:\n{}",
            self.system_prompt(),
            today,
            context.topic,
            tool_list,
            step.description
        );
        if let Some(query) = step.arg("query") {
            prompt.push_str(&format!("\nSuggested query: {}", query));
        }
        if !context.is_empty() {
            prompt.push_str("\n\nContext from previous steps:\n");
            prompt.push_str(&context.summary_within(self.config.max_context_chars));
        }
        prompt
    }

    /// Fill in the topic for search tools that were called without one.
    fn with_topic(&self, call: &ToolCall, topic: &str) -> Value {
        let mut args = match &call.arguments {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        if let Some((_, key)) = TOPIC_ARGUMENTS.iter().find(|(tool, _)| *tool == call.name) {
            let missing = args
                .get(*key)
                .and_then(|v| v.as_str())
                .map(|s| s.trim().is_empty())
                .unwrap_or(true);
            if missing {
                args.insert(key.to_string(), Value::String(topic.to_string()));
            }
        }
        Value::Object(args)
    }

    /// Run one tool call. Returns the transcript entry, and a note when the call did not help.
    async fn run_tool(&self, call: &ToolCall, topic: &str) -> (String, Option<String>) {
        let args = self.with_topic(call, topic);
        tracing::debug!(tool = %call.name, %args, "Researcher calling tool");

        match self.tools.invoke(&call.name, args).await {
            Ok(text) if text.trim().is_empty() => {
                let note = format!("Tool '{}' returned no results.", call.name);
                (format!("Tool {} result: (empty)", call.name), Some(note))
            }
            Ok(text) => {
                let max = self.config.max_tool_result_chars;
                let note = format!(
                    "\n\n[Tool result truncated - showing first {} characters of {} total]",
                    max,
                    text.chars().count()
                );
                let text = truncate_chars(&text, max, &note);
                (format!("Tool {} result:\n{}", call.name, text), None)
            }
            Err(ToolError::Unavailable { tool }) => {
                tracing::warn!(tool = %tool, "Model requested a tool that is not connected");
                let note = format!("Tool '{}' is not available; skipped.", tool);
                (format!("Tool {} result: not available", tool), Some(note))
            }
            Err(e @ ToolError::Execution { .. }) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                let note = format!("Tool call failed: {}", e);
                (format!("Tool {} result: error: {}", call.name, e), Some(note))
            }
        }
    }

    fn backend_error(&self, e: impl std::fmt::Display) -> AgentExecutionError {
        AgentExecutionError::new(self.name(), e.to_string())
    }
}

#[async_trait]
impl Agent for ResearcherAgent {
    async fn execute(
        &self,
        step: &Step,
        context: &Context,
    ) -> std::result::Result<String, AgentExecutionError> {
        let topic = step.arg("topic").unwrap_or(&context.topic).to_string();
        let definitions = self.tools.tool_definitions();
        let mut transcript = self.build_prompt(step, context);
        let mut notes: Vec<String> = Vec::new();
        let mut summary: Option<String> = None;

        for turn in 1..=self.config.max_tool_turns {
            let response = self
                .llm
                .generate_with_tools(&transcript, &definitions)
                .await
                .map_err(|e| self.backend_error(e))?;

            if response.tool_calls.is_empty() {
                summary = Some(response.content);
                break;
            }

            tracing::debug!(turn, calls = response.tool_calls.len(), "Researcher tool turn");
            if !response.content.trim().is_empty() {
                transcript.push_str(&format!("\n\nAssistant: {}", response.content.trim()));
            }
            for call in &response.tool_calls {
                let (entry, note) = self.run_tool(call, &topic).await;
                transcript.push_str("\n\n");
                transcript.push_str(&entry);
                notes.extend(note);
            }
        }

        let summary = match summary {
            Some(text) => text,
            None => {
                // Turn budget spent on tool calls; ask for a summary without tools.
                transcript.push_str(
                    "\n\nYou have used all tool turns. Summarize the findings above now.",
                );
                self.llm
                    .generate(&transcript)
                    .await
                    .map_err(|e| self.backend_error(e))?
            }
        };

        let mut output = if summary.trim().is_empty() {
            "No content generated.".to_string()
        } else {
            summary.trim().to_string()
        };
        if !notes.is_empty() {
            output.push_str("\n\n### Research notes\n");
            output.push_str(
                &notes
                    .iter()
                    .map(|n| format!("- {}", n))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        "researcher"
    }

    fn system_prompt(&self) -> String {
        "You are a research assistant specialized in gathering and synthesizing information \
         from external sources. Use the available tools when helpful and always synthesize \
         what you find into a clear, comprehensive research summary."
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMResponse;
    use crate::tools::{RemoteError, ToolConnection};
    use crate::types::{Result, ToolDefinition};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;

    struct Turns {
        replies: Mutex<VecDeque<LLMResponse>>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl Turns {
        fn new(replies: Vec<LLMResponse>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    fn calls(names: &[(&str, Value)]) -> LLMResponse {
        LLMResponse {
            content: String::new(),
            tool_calls: names
                .iter()
                .enumerate()
                .map(|(i, (name, args))| ToolCall {
                    id: format!("call_{}", i),
                    name: name.to_string(),
                    arguments: args.clone(),
                })
                .collect(),
            finish_reason: "tool_calls".to_string(),
        }
    }

    fn answer(text: &str) -> LLMResponse {
        LLMResponse {
            content: text.to_string(),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
        }
    }

    #[async_trait]
    impl LLMClient for Turns {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            Ok("forced summary".to_string())
        }

        async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
            self.generate(prompt).await
        }

        async fn generate_with_tools(
            &self,
            prompt: &str,
            _tools: &[ToolDefinition],
        ) -> Result<LLMResponse> {
            self.prompts.lock().push(prompt.to_string());
            Ok(self
                .replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| answer("done")))
        }

        fn model_name(&self) -> &str {
            "turns"
        }
    }

    struct Library {
        seen: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl ToolConnection for Library {
        fn label(&self) -> &str {
            "library"
        }

        async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
            Ok(["arxiv_search", "flaky"]
                .iter()
                .map(|n| ToolDefinition {
                    name: n.to_string(),
                    description: String::new(),
                    parameters: json!({"type": "object"}),
                })
                .collect())
        }

        async fn call(&self, name: &str, args: Value) -> std::result::Result<Value, RemoteError> {
            self.seen.lock().push((name.to_string(), args.clone()));
            match name {
                "flaky" => Err(RemoteError::new("503 from upstream")),
                _ => Ok(json!(format!("papers about {}", args["topic"].as_str().unwrap_or("?")))),
            }
        }
    }

    async fn invoker() -> (Arc<ToolInvoker>, Arc<Library>) {
        let library = Arc::new(Library {
            seen: Mutex::new(Vec::new()),
        });
        let mut invoker = ToolInvoker::new();
        invoker.attach(library.clone()).await.unwrap();
        (Arc::new(invoker), library)
    }

    fn agent(llm: Turns, tools: Arc<ToolInvoker>) -> ResearcherAgent {
        ResearcherAgent::new(Box::new(llm), tools, ResearchConfig::default())
    }

    #[tokio::test]
    async fn test_topic_injected_into_search_tools() {
        let (tools, library) = invoker().await;
        let llm = Turns::new(vec![calls(&[("arxiv_search", json!({}))]), answer("summary")]);
        let researcher = agent(llm, tools);

        let output = researcher
            .execute(&Step::new("research", "find papers"), &Context::empty("spin glasses"))
            .await
            .unwrap();

        assert_eq!(output, "summary");
        let seen = library.seen.lock();
        assert_eq!(seen[0].1["topic"], "spin glasses");
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_note() {
        let (tools, _) = invoker().await;
        let llm = Turns::new(vec![
            calls(&[("wikipedia_search", json!({"topic": "x"}))]),
            answer("partial summary"),
        ]);
        let researcher = agent(llm, tools);

        let output = researcher
            .execute(&Step::new("research", "look it up"), &Context::empty("x"))
            .await
            .unwrap();

        assert!(output.starts_with("partial summary"));
        assert!(output.contains("Tool 'wikipedia_search' is not available; skipped."));
    }

    #[tokio::test]
    async fn test_tool_failure_becomes_note() {
        let (tools, _) = invoker().await;
        let llm = Turns::new(vec![calls(&[("flaky", json!({}))]), answer("what we have")]);
        let researcher = agent(llm, tools);

        let output = researcher
            .execute(&Step::new("research", "try"), &Context::empty("x"))
            .await
            .unwrap();

        assert!(output.contains("### Research notes"));
        assert!(output.contains("503 from upstream"));
    }

    #[tokio::test]
    async fn test_turn_budget_forces_summary() {
        let (tools, library) = invoker().await;
        let endless: Vec<LLMResponse> = (0..10)
            .map(|_| calls(&[("arxiv_search", json!({"topic": "loops"}))]))
            .collect();
        let researcher = ResearcherAgent::new(
            Box::new(Turns::new(endless)),
            tools,
            ResearchConfig {
                max_tool_turns: 2,
                ..ResearchConfig::default()
            },
        );

        let output = researcher
            .execute(&Step::new("research", "loop"), &Context::empty("loops"))
            .await
            .unwrap();

        assert_eq!(output, "forced summary");
        assert_eq!(library.seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_prompt_includes_context() {
        let (tools, _) = invoker().await;
        let context = crate::memory::Context {
            topic: "t".to_string(),
            summary: "Step 1 executed by writer:\nearlier".to_string(),
            latest_draft: None,
            prior_steps: 1,
        };
        let llm = Turns::new(vec![answer("ok")]);
        let prompts = Arc::clone(&llm.prompts);
        let researcher = agent(llm, tools);
        researcher
            .execute(&Step::new("research", "dig").with_arg("query", "q1"), &context)
            .await
            .unwrap();

        let prompts = prompts.lock();
        assert!(prompts[0].contains("Context from previous steps:\nStep 1 executed by writer"));
        assert!(prompts[0].contains("Suggested query: q1"));
    }
}
