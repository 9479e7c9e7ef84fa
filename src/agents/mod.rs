//! Agents and the capability vocabulary plans are written in.
//!
//! A plan step names a verb; the [`CapabilityRegistry`] maps that verb onto
//! exactly one [`Agent`]. The engine only ever talks to agents through the
//! trait, never through their concrete types.

pub mod editor;
pub mod planner;
pub mod registry;
pub mod researcher;
pub mod writer;

use crate::memory::Context;
use crate::types::{AgentExecutionError, Step};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use editor::EditorAgent;
pub use planner::PlanGenerator;
pub use registry::{AgentHandle, CapabilityRegistry, CapabilityRegistryBuilder, UnknownCapability};
pub use researcher::ResearcherAgent;
pub use writer::WriterAgent;

/// Base trait for all agents
#[async_trait]
pub trait Agent: Send + Sync {
    /// Execute one plan step against a snapshot of prior work
    async fn execute(
        &self,
        step: &Step,
        context: &Context,
    ) -> std::result::Result<String, AgentExecutionError>;

    /// Name recorded in the execution history
    fn name(&self) -> &str;

    /// Get the agent's system prompt
    fn system_prompt(&self) -> String;

    /// The deliverable part of `output`, if this agent produces documents.
    ///
    /// Drafting agents return `Some`; the engine picks the final artifact and the
    /// `latest_draft` handed to later steps from these.
    fn artifact(&self, _output: &str) -> Option<String> {
        None
    }
}

/// The closed set of capabilities a plan may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Research,
    Write,
    Edit,
}

impl Capability {
    pub const ALL: [Capability; 3] = [Capability::Research, Capability::Write, Capability::Edit];

    /// The verb plans use for this capability
    pub fn verb(&self) -> &'static str {
        match self {
            Capability::Research => "research",
            Capability::Write => "write",
            Capability::Edit => "edit",
        }
    }

    /// One-line description used when prompting the planner
    pub fn description(&self) -> &'static str {
        match self {
            Capability::Research => {
                "search external sources (web, papers, encyclopedias) and summarize findings"
            }
            Capability::Write => "draft, expand or summarize research content into a document",
            Capability::Edit => "critique a draft against criteria and return a revised draft",
        }
    }

    pub fn from_verb(verb: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.verb() == verb)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_verbs_round_trip() {
        for capability in Capability::ALL {
            assert_eq!(Capability::from_verb(capability.verb()), Some(capability));
        }
    }

    #[test]
    fn test_unknown_verb() {
        assert_eq!(Capability::from_verb("summarize"), None);
        assert_eq!(Capability::from_verb("Research"), None);
    }
}
