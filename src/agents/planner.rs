//! Plan generation.
//!
//! The planner asks the backend for a JSON list of steps, parses it, and
//! validates every verb against the [`CapabilityRegistry`]. Invalid output is
//! retried a bounded number of times with the previous error spelled out in the
//! prompt; after that the failure goes back to the caller.

use crate::agents::CapabilityRegistry;
use crate::llm::LLMClient;
use crate::types::{Plan, PlanError, Step, WorkflowError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// How much of a bad response is quoted back in parse errors.
const SNIPPET_CHARS: usize = 200;

/// Hard ceiling on retries regardless of configuration.
pub const MAX_PLAN_RETRIES: u32 = 5;

/// Turns a topic into a validated [`Plan`].
pub struct PlanGenerator {
    llm: Box<dyn LLMClient>,
    retry_limit: u32,
    timeout: Option<Duration>,
}

impl PlanGenerator {
    /// `retry_limit` counts additional attempts after the first one.
    pub fn new(llm: Box<dyn LLMClient>, retry_limit: u32) -> Self {
        Self {
            llm,
            retry_limit: retry_limit.min(MAX_PLAN_RETRIES),
            timeout: None,
        }
    }

    /// Bound the whole planning phase, retries included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    pub fn system_prompt(&self) -> String {
        "You are a planning agent specialized in creating structured research workflows. \
         Break research topics into clear, atomic steps, each executable by exactly one of the \
         available capabilities. Focus on searching, summarizing, drafting and revising; never \
         include file management, environment setup or data export. Respond with JSON only."
            .to_string()
    }

    /// Generate a plan for `topic`.
    ///
    /// Planning succeeds on the first attempt whose output parses and validates.
    pub async fn generate(
        &self,
        topic: &str,
        max_steps: usize,
        registry: &CapabilityRegistry,
    ) -> std::result::Result<Plan, WorkflowError> {
        let deadline = self.timeout.map(|t| tokio::time::Instant::now() + t);
        let max_attempts = self.retry_limit + 1;
        let mut last_error: Option<PlanError> = None;

        for attempt in 1..=max_attempts {
            let prompt = build_prompt(topic, max_steps, registry, last_error.as_ref());
            let system = self.system_prompt();
            let request = self.llm.generate_with_system(&system, &prompt);

            let response = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, request).await {
                    Ok(response) => response,
                    Err(_) => {
                        let limit = self.timeout.unwrap_or_default();
                        tracing::error!(topic, attempt, "Planning timed out after {:?}", limit);
                        return Err(WorkflowError::PlanningFailed {
                            topic: topic.to_string(),
                            attempts: attempt,
                            last_error: PlanError::Timeout(limit),
                        });
                    }
                },
                None => request.await,
            };

            let outcome = response
                .map_err(|e| PlanError::Backend(e.to_string()))
                .and_then(|raw| parse_plan(&raw))
                .and_then(|steps| Plan::validated(steps, |verb| registry.contains(verb)));

            match outcome {
                Ok(plan) => {
                    tracing::info!(topic, attempt, steps = plan.len(), "Plan generated");
                    return Ok(plan);
                }
                Err(e) => {
                    tracing::warn!(topic, attempt, max_attempts, error = %e, "Rejected plan");
                    last_error = Some(e);
                }
            }
        }

        Err(WorkflowError::PlanningFailed {
            topic: topic.to_string(),
            attempts: max_attempts,
            last_error: last_error.unwrap_or(PlanError::EmptyPlan),
        })
    }
}

/// Build the planning prompt, restating the previous rejection when retrying.
pub fn build_prompt(
    topic: &str,
    max_steps: usize,
    registry: &CapabilityRegistry,
    previous_error: Option<&PlanError>,
) -> String {
    let capabilities = registry
        .capabilities()
        .iter()
        .map(|c| format!("- \"{}\": {}", c.verb(), c.description()))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        r#"Create a step-by-step research plan for the following topic.

Topic: "{topic}"

Available capabilities (use these verbs exactly):
{capabilities}

Requirements:
- Use at most {max_steps} steps.
- Each step must be executable by one capability.
- The final step should produce the complete Markdown research report.

Return a JSON array of steps:
[
    {{"verb": "research", "description": "Search for recent survey papers", "args": {{"query": "..."}}}},
    {{"verb": "write", "description": "Draft the report", "args": {{}}}}
]"#
    );

    if let Some(error) = previous_error {
        prompt.push_str(&format!(
            "\n\nYour previous answer was rejected: {}. Return only a corrected JSON array.",
            error
        ));
    }
    prompt
}

/// Parse backend output into steps.
///
/// Accepts a bare JSON array or an object with a `steps` array, optionally
/// wrapped in a code fence or surrounded by prose. Verbs are lowercased and
/// non-string argument values are stringified. Verbs are not checked here.
pub fn parse_plan(raw: &str) -> std::result::Result<Vec<Step>, PlanError> {
    let cleaned = crate::utils::strip_code_fence(raw);
    let parse_error = |reason: String| PlanError::Parse {
        snippet: crate::utils::truncate_chars(raw.trim(), SNIPPET_CHARS, "..."),
        reason,
    };

    let value: Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(first_error) => {
            embedded_array(cleaned).ok_or_else(|| parse_error(first_error.to_string()))?
        }
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("steps") {
            Some(Value::Array(items)) => items,
            _ => return Err(parse_error("expected a JSON array of steps".to_string())),
        },
        _ => return Err(parse_error("expected a JSON array of steps".to_string())),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_step(item).map_err(|reason| parse_error(format!("step {}: {}", i + 1, reason))))
        .collect()
}

/// First array of objects embedded in `text`, ignoring whatever follows it.
fn embedded_array(text: &str) -> Option<Value> {
    text.match_indices('[').find_map(|(start, _)| {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Array(items))) if items.iter().all(Value::is_object) => {
                Some(Value::Array(items))
            }
            _ => None,
        }
    })
}

fn parse_step(item: &Value) -> std::result::Result<Step, String> {
    let map = item.as_object().ok_or_else(|| "not an object".to_string())?;

    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| map.get(*k).and_then(|v| v.as_str()))
            .map(|s| s.trim().to_string())
    };

    let verb = field(&["verb", "capability", "agent"])
        .filter(|v| !v.is_empty())
        .ok_or_else(|| "missing 'verb'".to_string())?
        .to_lowercase();
    let description = field(&["description", "task", "step"]).unwrap_or_default();

    let args = match map.get("args") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(args)) => args
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect(),
        Some(_) => return Err("'args' must be an object".to_string()),
    };

    Ok(Step {
        verb,
        description,
        args,
    })
}
