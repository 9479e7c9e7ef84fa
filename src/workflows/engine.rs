//! Orchestration engine
//!
//! Turns a topic into a validated plan and walks it step by step, routing each
//! step through the [`CapabilityRegistry`] and recording every outcome in the
//! run's [`History`].

use crate::agents::{
    Agent, CapabilityRegistry, EditorAgent, PlanGenerator, ResearcherAgent, WriterAgent,
};
use crate::llm::{LLMClient, LLMClientFactoryTrait};
use crate::memory::build_context;
use crate::tools::ToolInvoker;
use crate::types::{
    ExecutionRecord, History, Plan, PlanError, StepStatus, TerminationReason, WorkflowError,
    WorkflowResult,
};
use crate::utils::toml_config::{ModelRole, WorkflowSettings};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

/// Lifecycle of one workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Planning,
    Executing,
    Completed,
    Aborted,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Completed | WorkflowState::Aborted)
    }
}

struct ActiveRun {
    cancel: CancellationToken,
    state: WorkflowState,
}

/// Coordinates planning and execution of research workflows.
///
/// The engine itself holds no per-run state apart from the cancellation
/// handles of runs in flight; every run builds its own clients, registry,
/// plan and history, so concurrent runs never observe each other.
pub struct OrchestrationEngine {
    factory: Arc<dyn LLMClientFactoryTrait>,
    tools: Arc<ToolInvoker>,
    settings: WorkflowSettings,
    active_runs: Mutex<HashMap<String, ActiveRun>>,
}

/// Removes a run from the active set however the run ends.
struct RunGuard<'a> {
    engine: &'a OrchestrationEngine,
    run_id: String,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.engine.active_runs.lock().remove(&self.run_id);
    }
}

impl OrchestrationEngine {
    pub fn new(
        factory: Arc<dyn LLMClientFactoryTrait>,
        tools: Arc<ToolInvoker>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            factory,
            tools,
            settings,
            active_runs: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn tools(&self) -> &Arc<ToolInvoker> {
        &self.tools
    }

    /// Run a full workflow for `topic`.
    ///
    /// `model` is used for every role that has no per-role override.
    pub async fn run_workflow(
        &self,
        topic: &str,
        model: &str,
        max_steps: usize,
    ) -> std::result::Result<WorkflowResult, WorkflowError> {
        self.run_workflow_with_cancel(topic, model, max_steps, CancellationToken::new())
            .await
    }

    /// Run a workflow with the configured model and step budget.
    pub async fn run_configured(
        &self,
        topic: &str,
    ) -> std::result::Result<WorkflowResult, WorkflowError> {
        self.run_workflow(topic, &self.settings.model, self.settings.max_steps)
            .await
    }

    /// Like [`run_workflow`](Self::run_workflow), stopping at the next step
    /// boundary once `cancel` fires.
    pub async fn run_workflow_with_cancel(
        &self,
        topic: &str,
        model: &str,
        max_steps: usize,
        cancel: CancellationToken,
    ) -> std::result::Result<WorkflowResult, WorkflowError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("workflow", run_id = %run_id, topic = %topic);

        async {
            let _guard = self.register_run(&run_id, cancel.clone());
            info!(model, max_steps, "Starting workflow");

            let outcome = async {
                let registry = self.build_registry(topic, model).await?;
                let planner = self.build_planner(topic, model).await?;
                let plan = planner.generate(topic, max_steps, &registry).await?;
                self.set_state(&run_id, WorkflowState::Executing);
                self.execute_steps(&run_id, topic, &plan, &registry, max_steps, &cancel)
                    .await
            }
            .await;

            match &outcome {
                Ok(result) => {
                    self.set_state(&run_id, WorkflowState::Completed);
                    info!(
                        steps = result.history.len(),
                        failed = result.history.failed().count(),
                        reason = ?result.terminated_reason,
                        "Workflow completed"
                    );
                }
                Err(e) => {
                    self.set_state(&run_id, WorkflowState::Aborted);
                    error!(reason = ?e.abort_reason(), error = %e, "Workflow aborted");
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    /// Generate and validate a plan without executing it.
    pub async fn generate_plan(
        &self,
        topic: &str,
        model: &str,
        max_steps: usize,
    ) -> std::result::Result<Plan, WorkflowError> {
        let registry = self.build_registry(topic, model).await?;
        let planner = self.build_planner(topic, model).await?;
        planner.generate(topic, max_steps, &registry).await
    }

    /// Execute an already validated plan against `registry`.
    ///
    /// Every verb is resolved again at dispatch time; a verb that no longer
    /// resolves aborts the run with [`WorkflowError::CapabilityDrift`].
    pub async fn execute_plan(
        &self,
        topic: &str,
        plan: &Plan,
        registry: &CapabilityRegistry,
        max_steps: usize,
        cancel: &CancellationToken,
    ) -> std::result::Result<WorkflowResult, WorkflowError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("workflow", run_id = %run_id, topic = %topic);

        async {
            let _guard = self.register_run(&run_id, cancel.clone());
            self.set_state(&run_id, WorkflowState::Executing);
            let outcome = self
                .execute_steps(&run_id, topic, plan, registry, max_steps, cancel)
                .await;
            let state = if outcome.is_ok() {
                WorkflowState::Completed
            } else {
                WorkflowState::Aborted
            };
            self.set_state(&run_id, state);
            outcome
        }
        .instrument(span)
        .await
    }

    /// Cancel every run in flight. Each stops at its next step boundary.
    pub fn cancel_all(&self) -> usize {
        let runs = self.active_runs.lock();
        for run in runs.values() {
            run.cancel.cancel();
        }
        runs.len()
    }

    /// Ids and states of the runs currently in flight
    pub fn active_runs(&self) -> Vec<(String, WorkflowState)> {
        self.active_runs
            .lock()
            .iter()
            .map(|(id, run)| (id.clone(), run.state))
            .collect()
    }

    fn register_run(&self, run_id: &str, cancel: CancellationToken) -> RunGuard<'_> {
        self.active_runs.lock().insert(
            run_id.to_string(),
            ActiveRun {
                cancel,
                state: WorkflowState::Planning,
            },
        );
        RunGuard {
            engine: self,
            run_id: run_id.to_string(),
        }
    }

    fn set_state(&self, run_id: &str, next: WorkflowState) {
        if let Some(run) = self.active_runs.lock().get_mut(run_id) {
            debug!(from = ?run.state, to = ?next, "State transition");
            run.state = next;
        }
    }

    async fn client_for(
        &self,
        topic: &str,
        role: ModelRole,
        model: &str,
    ) -> std::result::Result<Box<dyn LLMClient>, WorkflowError> {
        let model = self.settings.models.for_role(role, model);
        self.factory.create_for_model(model).await.map_err(|e| {
            error!(role = role.as_str(), model, error = %e, "Could not create backend client");
            WorkflowError::PlanningFailed {
                topic: topic.to_string(),
                attempts: 0,
                last_error: PlanError::Backend(e.to_string()),
            }
        })
    }

    async fn build_planner(
        &self,
        topic: &str,
        model: &str,
    ) -> std::result::Result<PlanGenerator, WorkflowError> {
        let client = self.client_for(topic, ModelRole::Planner, model).await?;
        Ok(PlanGenerator::new(client, self.settings.plan_retry_limit)
            .with_timeout(self.settings.plan_timeout))
    }

    /// Build this run's agents, each on its own client.
    async fn build_registry(
        &self,
        topic: &str,
        model: &str,
    ) -> std::result::Result<CapabilityRegistry, WorkflowError> {
        let (research, writer, editor) = futures::try_join!(
            self.client_for(topic, ModelRole::Research, model),
            self.client_for(topic, ModelRole::Writer, model),
            self.client_for(topic, ModelRole::Editor, model),
        )?;

        CapabilityRegistry::builder()
            .with_researcher(Arc::new(ResearcherAgent::new(
                research,
                Arc::clone(&self.tools),
                self.settings.research.clone(),
            )))
            .with_writer(Arc::new(WriterAgent::new(
                writer,
                self.settings.writer.clone(),
            )))
            .with_editor(Arc::new(EditorAgent::new(
                editor,
                self.settings.editor.clone(),
            )))
            .build()
            .map_err(|e| WorkflowError::PlanningFailed {
                topic: topic.to_string(),
                attempts: 0,
                last_error: PlanError::Backend(e.to_string()),
            })
    }

    async fn execute_steps(
        &self,
        run_id: &str,
        topic: &str,
        plan: &Plan,
        registry: &CapabilityRegistry,
        max_steps: usize,
        cancel: &CancellationToken,
    ) -> std::result::Result<WorkflowResult, WorkflowError> {
        let mut history = History::new();
        let mut terminated_reason = TerminationReason::Completed;
        let step_timeout = self.settings.step_timeout;

        for (index, step) in plan.steps().iter().enumerate() {
            if index >= max_steps {
                info!(max_steps, remaining = plan.len() - index, "Step budget exhausted");
                terminated_reason = TerminationReason::StepBudgetExceeded;
                break;
            }
            if cancel.is_cancelled() {
                info!(step = index, "Run cancelled before step");
                terminated_reason = TerminationReason::ExplicitStop;
                break;
            }

            let handle = registry.resolve(&step.verb).map_err(|e| {
                error!(step = index, verb = %e.verb, "Capability no longer registered");
                WorkflowError::CapabilityDrift {
                    verb: e.verb,
                    step_index: index,
                }
            })?;

            let prior = history.records();
            let context = build_context(topic, prior, latest_draft(registry, prior));
            info!(
                step = index,
                verb = %step.verb,
                agent = handle.name(),
                "Dispatching step"
            );

            let started_at = Utc::now();
            let clock = Instant::now();
            let outcome =
                tokio::time::timeout(step_timeout, handle.agent.execute(step, &context)).await;
            let duration_ms = clock.elapsed().as_millis() as u64;

            let (output, status) = match outcome {
                Ok(Ok(output)) => (output, StepStatus::Ok),
                Ok(Err(e)) => {
                    warn!(step = index, agent = handle.name(), error = %e, "Step failed");
                    (e.to_string(), StepStatus::Failed)
                }
                Err(_) => {
                    warn!(step = index, agent = handle.name(), "Step timed out");
                    (
                        format!("{} timed out after {:?}", handle.name(), step_timeout),
                        StepStatus::Failed,
                    )
                }
            };

            history.push(ExecutionRecord {
                step_index: index,
                verb: step.verb.clone(),
                agent_name: handle.name().to_string(),
                output,
                status,
                started_at,
                duration_ms,
            });

            if step.is_terminal() && index + 1 < plan.len() {
                info!(step = index, "Terminal step reached");
                terminated_reason = TerminationReason::ExplicitStop;
                break;
            }
        }

        let final_artifact = final_artifact(registry, history.records());
        Ok(WorkflowResult {
            run_id: run_id.to_string(),
            topic: topic.to_string(),
            history,
            final_artifact,
            terminated_reason,
        })
    }
}

fn drafting_agent<'a>(
    registry: &'a CapabilityRegistry,
    record: &ExecutionRecord,
) -> Option<&'a Arc<dyn Agent>> {
    registry.agent_named(&record.agent_name)
}

/// The most recent document produced by a drafting agent among `records`.
pub fn latest_draft(registry: &CapabilityRegistry, records: &[ExecutionRecord]) -> Option<String> {
    records
        .iter()
        .rev()
        .filter(|r| r.is_ok())
        .find_map(|r| drafting_agent(registry, r).and_then(|agent| agent.artifact(&r.output)))
}

/// Pick the deliverable of a run.
///
/// Prefers the last successful drafting step, then the last successful step of
/// any kind. A run with no successful step gets a summary of its failures so
/// the artifact is never empty.
pub fn final_artifact(registry: &CapabilityRegistry, records: &[ExecutionRecord]) -> String {
    if let Some(draft) = latest_draft(registry, records) {
        return draft;
    }
    if let Some(last_ok) = records.iter().rev().find(|r| r.is_ok()) {
        return last_ok.output.clone();
    }
    if records.is_empty() {
        return "No steps were executed.".to_string();
    }

    let failures = records
        .iter()
        .map(|r| format!("- Step {} ({}): {}", r.step_index + 1, r.agent_name, r.output))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Every step failed; no report could be produced.\n\n{}", failures)
}
