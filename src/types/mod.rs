//! Core types shared across the orchestration engine: the plan/history data model,
//! tool wire types and the error taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

// ============= Plan Types =============

/// One unit of work in a plan.
///
/// `verb` names a capability from the [`CapabilityRegistry`](crate::agents::CapabilityRegistry);
/// `args` carries free-form string arguments produced by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub verb: String,
    pub description: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

impl Step {
    pub fn new(verb: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            description: description.into(),
            args: BTreeMap::new(),
        }
    }

    /// Builder-style helper for attaching an argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Look up an argument by key.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(|s| s.as_str())
    }

    /// Whether the planner marked this step as the last one to run.
    pub fn is_terminal(&self) -> bool {
        self.arg("terminal")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// A validated, non-empty, ordered list of steps.
///
/// A `Plan` can only be obtained through [`Plan::validated`], which checks every
/// verb against the set of known capabilities. Once built it is immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    /// Validate `steps` against a verb predicate.
    pub fn validated<F>(steps: Vec<Step>, is_known_verb: F) -> std::result::Result<Self, PlanError>
    where
        F: Fn(&str) -> bool,
    {
        if steps.is_empty() {
            return Err(PlanError::EmptyPlan);
        }
        if let Some(bad) = steps.iter().find(|s| !is_known_verb(&s.verb)) {
            return Err(PlanError::InvalidCapabilityReference {
                verb: bad.verb.clone(),
            });
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a validated plan; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

// ============= History Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Ok,
    Failed,
}

/// The outcome of executing one plan step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub step_index: usize,
    pub verb: String,
    pub agent_name: String,
    pub output: String,
    pub status: StepStatus,
    /// When the step was dispatched
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the step in milliseconds
    pub duration_ms: u64,
}

impl ExecutionRecord {
    pub fn is_ok(&self) -> bool {
        self.status == StepStatus::Ok
    }
}

/// Append-only ordered log of executed steps.
///
/// Records can only be pushed; nothing hands out a mutable reference to an
/// existing record. Readers get a slice snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    records: Vec<ExecutionRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ExecutionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.records.iter().filter(|r| !r.is_ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Completed,
    StepBudgetExceeded,
    ExplicitStop,
}

/// Final product of one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub run_id: String,
    pub topic: String,
    pub history: History,
    pub final_artifact: String,
    pub terminated_reason: TerminationReason,
}

impl WorkflowResult {
    /// Whether any step in the run failed.
    pub fn is_degraded(&self) -> bool {
        self.history.failed().next().is_some()
    }
}

// ============= Tool Types =============

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

// ============= Error Types =============

/// Reasons the planner could not produce a valid plan.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlanError {
    #[error("could not parse plan ({reason}): {snippet}")]
    Parse { snippet: String, reason: String },

    #[error("plan references unknown capability '{verb}'")]
    InvalidCapabilityReference { verb: String },

    #[error("plan contains no steps")]
    EmptyPlan,

    #[error("backend failure during planning: {0}")]
    Backend(String),

    #[error("planning timed out after {0:?}")]
    Timeout(Duration),
}

/// A role implementation failed to produce a result for a step.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{agent} failed: {message}")]
pub struct AgentExecutionError {
    pub agent: String,
    pub message: String,
}

impl AgentExecutionError {
    pub fn new(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("tool '{tool}' is not available")]
    Unavailable { tool: String },

    #[error("tool '{tool}' failed: {cause}")]
    Execution { tool: String, cause: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    PlanningFailed,
    CapabilityDrift,
}

/// Failures that end a run without producing a usable artifact.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkflowError {
    #[error("planning failed for '{topic}' after {attempts} attempt(s): {last_error}")]
    PlanningFailed {
        topic: String,
        attempts: u32,
        last_error: PlanError,
    },

    #[error("capability '{verb}' at step {step_index} is no longer registered")]
    CapabilityDrift { verb: String, step_index: usize },
}

impl WorkflowError {
    pub fn abort_reason(&self) -> AbortReason {
        match self {
            WorkflowError::PlanningFailed { .. } => AbortReason::PlanningFailed,
            WorkflowError::CapabilityDrift { .. } => AbortReason::CapabilityDrift,
        }
    }
}

/// Crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend rate limited: {0}")]
    BackendRateLimited(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Config(#[from] crate::utils::toml_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, AppError>;
