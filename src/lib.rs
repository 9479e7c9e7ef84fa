//! # Lyceum - multi-agent research orchestrator
//!
//! Lyceum turns a research topic into a Markdown report. A planner model writes
//! a step-by-step plan, the plan is validated against a closed vocabulary of
//! capabilities, and an orchestration engine executes it with a researcher, a
//! writer and an editor agent.
//!
//! ## Overview
//!
//! Lyceum can be used in two ways:
//!
//! 1. **As a command-line tool** - Run the `lyceum` binary
//! 2. **As a library** - Embed the [`OrchestrationEngine`] in your own project
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use lyceum::{ConfigManager, LLMClientFactory, LocalToolConnection, OrchestrationEngine, ToolInvoker};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigManager::new("lyceum.toml")?.config();
//!
//!     let mut tools = ToolInvoker::new();
//!     tools.attach(Arc::new(LocalToolConnection::with_builtin_tools(true, true, 5))).await?;
//!
//!     let engine = OrchestrationEngine::new(
//!         Arc::new(LLMClientFactory::new(config.provider.clone())),
//!         Arc::new(tools),
//!         config.workflow_settings(),
//!     );
//!     let result = engine.run_workflow("graph neural networks", "llama3.2", 10).await?;
//!     println!("{}", result.final_artifact);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI API support |
//! | `mcp` | stdio Model Context Protocol tool servers |
//!
//! ## Modules
//!
//! - [`agents`] - Capability registry, planner and the research/write/edit agents
//! - [`llm`] - Text-generation backend clients
//! - [`tools`] - Tool connections and the tool invoker
//! - [`memory`] - Folding execution history into agent context
//! - [`workflows`] - The orchestration engine
//! - [`types`] - Data model and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Agents, capabilities and plan generation.
pub mod agents;
/// Command-line interface helpers.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Model Context Protocol (MCP) tool connections.
#[cfg(feature = "mcp")]
pub mod mcp;
/// Context handed to agents between steps.
pub mod memory;
/// Tool connections and invocation.
pub mod tools;
/// Core types (plan, history, errors).
pub mod types;
/// Configuration and text utilities.
pub mod utils;
/// Workflow orchestration engine.
pub mod workflows;

// Re-export commonly used types
pub use agents::{Agent, Capability, CapabilityRegistry, PlanGenerator};
pub use llm::{LLMClient, LLMClientFactory, LLMClientFactoryTrait, LLMResponse, Provider};
pub use memory::Context;
pub use tools::{LocalToolConnection, ToolConnection, ToolInvoker};
pub use types::{
    AppError, ExecutionRecord, History, Plan, Result, Step, StepStatus, TerminationReason,
    WorkflowError, WorkflowResult,
};
pub use utils::toml_config::{ConfigManager, LyceumConfig, WorkflowSettings};
pub use workflows::{OrchestrationEngine, WorkflowState};
