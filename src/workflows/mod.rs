//! Workflow Engine Module
//!
//! A workflow run moves through `Planning → Executing → Completed`, or ends in
//! `Aborted` when no usable plan could be produced or the capability registry
//! stopped serving a planned verb.
//!
//! # Usage
//!
//! ```ignore
//! let engine = OrchestrationEngine::new(factory, tools, config.workflow_settings());
//! let result = engine.run_workflow("graph neural networks", "llama3.2", 10).await?;
//! for record in result.history.records() {
//!     println!("{} {:?}", record.agent_name, record.status);
//! }
//! println!("{}", result.final_artifact);
//! ```

pub mod engine;

pub use engine::{final_artifact, latest_draft, OrchestrationEngine, WorkflowState};
