//! Capability registry: the closed mapping from plan verbs to agents.
//!
//! The registry is assembled once, before planning, from the fixed
//! [`Capability`] vocabulary. There is no way to register a verb outside that
//! vocabulary, and a built registry cannot be modified.

use crate::agents::{Agent, Capability};
use crate::types::{AppError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lookup of a verb the registry does not serve.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability '{verb}'")]
pub struct UnknownCapability {
    pub verb: String,
}

/// The agent registered for one capability.
#[derive(Clone)]
pub struct AgentHandle {
    pub capability: Capability,
    pub agent: Arc<dyn Agent>,
}

impl AgentHandle {
    pub fn name(&self) -> &str {
        self.agent.name()
    }
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("capability", &self.capability)
            .field("agent", &self.agent.name())
            .finish()
    }
}

/// Immutable verb → agent mapping.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    handles: BTreeMap<Capability, AgentHandle>,
}

impl CapabilityRegistry {
    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder::new()
    }

    /// Resolve a plan verb to its agent. Pure lookup.
    pub fn resolve(&self, verb: &str) -> std::result::Result<&AgentHandle, UnknownCapability> {
        Capability::from_verb(verb)
            .and_then(|c| self.handles.get(&c))
            .ok_or_else(|| UnknownCapability {
                verb: verb.to_string(),
            })
    }

    pub fn contains(&self, verb: &str) -> bool {
        self.resolve(verb).is_ok()
    }

    /// Registered capabilities in a stable order
    pub fn capabilities(&self) -> Vec<Capability> {
        self.handles.keys().copied().collect()
    }

    pub fn verbs(&self) -> Vec<&'static str> {
        self.handles.keys().map(|c| c.verb()).collect()
    }

    /// All registered agents, in capability order
    pub fn handles(&self) -> impl Iterator<Item = &AgentHandle> {
        self.handles.values()
    }

    /// Agent registered under `name`, if any
    pub fn agent_named(&self, name: &str) -> Option<&Arc<dyn Agent>> {
        self.handles
            .values()
            .find(|h| h.agent.name() == name)
            .map(|h| &h.agent)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Builder for creating CapabilityRegistry with fluent API
pub struct CapabilityRegistryBuilder {
    handles: BTreeMap<Capability, AgentHandle>,
}

impl CapabilityRegistryBuilder {
    pub fn new() -> Self {
        Self {
            handles: BTreeMap::new(),
        }
    }

    /// Register `agent` for `capability`, replacing any earlier registration
    pub fn with_agent(mut self, capability: Capability, agent: Arc<dyn Agent>) -> Self {
        self.handles
            .insert(capability, AgentHandle { capability, agent });
        self
    }

    pub fn with_researcher(self, agent: Arc<dyn Agent>) -> Self {
        self.with_agent(Capability::Research, agent)
    }

    pub fn with_writer(self, agent: Arc<dyn Agent>) -> Self {
        self.with_agent(Capability::Write, agent)
    }

    pub fn with_editor(self, agent: Arc<dyn Agent>) -> Self {
        self.with_agent(Capability::Edit, agent)
    }

    /// Build the registry. At least one capability must be registered.
    pub fn build(self) -> Result<CapabilityRegistry> {
        if self.handles.is_empty() {
            return Err(AppError::Configuration(
                "CapabilityRegistry needs at least one registered agent".into(),
            ));
        }
        Ok(CapabilityRegistry {
            handles: self.handles,
        })
    }
}

impl Default for CapabilityRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
