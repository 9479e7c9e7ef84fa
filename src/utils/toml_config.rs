//! TOML-based configuration for Lyceum
//!
//! This module provides declarative configuration for the backend provider,
//! per-role models, workflow limits, agent budgets and tool connections via a
//! TOML file (`lyceum.toml`). Every section is optional; a missing file yields
//! the defaults.
//!
//! # Snapshots
//!
//! `ConfigManager` hands out immutable `Arc<LyceumConfig>` snapshots. A workflow
//! run captures one snapshot when it starts, so a reload never changes the
//! settings of a run already in flight.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "lyceum.toml";

/// Upper bound accepted for `workflow.plan_retry_limit`
pub const MAX_PLAN_RETRY_LIMIT: u32 = 5;

/// Root configuration structure loaded from lyceum.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LyceumConfig {
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Per-role model overrides
    #[serde(default)]
    pub models: RoleModels,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub writer: WriterConfig,

    #[serde(default)]
    pub editor: EditorConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    /// stdio MCP servers connected once at startup, keyed by name
    #[serde(default)]
    pub mcp_servers: BTreeMap<String, McpServerConfig>,

    #[serde(default)]
    pub output: OutputConfig,
}

// ============= Workflow Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Model used by every role without an override
    #[serde(default = "default_model")]
    pub model: String,

    /// Ceiling on executed steps per run
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Additional planning attempts after the first
    #[serde(default = "default_plan_retry_limit")]
    pub plan_retry_limit: u32,

    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,

    #[serde(default = "default_plan_timeout")]
    pub plan_timeout_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_max_steps() -> usize {
    10
}

fn default_plan_retry_limit() -> u32 {
    2
}

fn default_step_timeout() -> u64 {
    300
}

fn default_plan_timeout() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_steps: default_max_steps(),
            plan_retry_limit: default_plan_retry_limit(),
            step_timeout_secs: default_step_timeout(),
            plan_timeout_secs: default_plan_timeout(),
            log_level: default_log_level(),
        }
    }
}

// ============= Model Configuration =============

/// The roles that talk to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Planner,
    Research,
    Writer,
    Editor,
}

impl ModelRole {
    pub const ALL: [ModelRole; 4] = [
        ModelRole::Planner,
        ModelRole::Research,
        ModelRole::Writer,
        ModelRole::Editor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelRole::Planner => "planner",
            ModelRole::Research => "research",
            ModelRole::Writer => "writer",
            ModelRole::Editor => "editor",
        }
    }

    /// Environment variable overriding this role's model
    pub fn env_var(&self) -> &'static str {
        match self {
            ModelRole::Planner => "PLANNER_MODEL",
            ModelRole::Research => "RESEARCH_MODEL",
            ModelRole::Writer => "WRITER_MODEL",
            ModelRole::Editor => "EDITOR_MODEL",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleModels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
}

impl RoleModels {
    fn slot(&mut self, role: ModelRole) -> &mut Option<String> {
        match role {
            ModelRole::Planner => &mut self.planner,
            ModelRole::Research => &mut self.research,
            ModelRole::Writer => &mut self.writer,
            ModelRole::Editor => &mut self.editor,
        }
    }

    pub fn get(&self, role: ModelRole) -> Option<&str> {
        match role {
            ModelRole::Planner => self.planner.as_deref(),
            ModelRole::Research => self.research.as_deref(),
            ModelRole::Writer => self.writer.as_deref(),
            ModelRole::Editor => self.editor.as_deref(),
        }
    }

    /// Model for `role`, falling back to `default`
    pub fn for_role<'a>(&'a self, role: ModelRole, default: &'a str) -> &'a str {
        self.get(role).unwrap_or(default)
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    OpenAI {
        /// Environment variable containing API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Ollama {
            base_url: default_ollama_url(),
        }
    }
}

// ============= Agent Configuration =============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Backend turns the researcher may spend calling tools
    #[serde(default = "default_max_tool_turns")]
    pub max_tool_turns: usize,

    #[serde(default = "default_max_tool_result_chars")]
    pub max_tool_result_chars: usize,

    #[serde(default = "default_research_context_chars")]
    pub max_context_chars: usize,
}

fn default_max_tool_turns() -> usize {
    6
}

fn default_max_tool_result_chars() -> usize {
    10_000
}

fn default_research_context_chars() -> usize {
    crate::memory::DEFAULT_RESEARCH_CONTEXT_CHARS
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_tool_turns: default_max_tool_turns(),
            max_tool_result_chars: default_max_tool_result_chars(),
            max_context_chars: default_research_context_chars(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterConfig {
    #[serde(default = "default_writer_context_chars")]
    pub max_context_chars: usize,
}

fn default_writer_context_chars() -> usize {
    crate::memory::DEFAULT_WRITER_CONTEXT_CHARS
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_context_chars: default_writer_context_chars(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Criteria used when a step does not supply its own
    #[serde(default = "default_criteria")]
    pub criteria: String,
}

fn default_criteria() -> String {
    "clarity, logical structure, coherence between sections, academic tone, and sources cited for claims"
        .to_string()
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            criteria: default_criteria(),
        }
    }
}

// ============= Tool Configuration =============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Built-in daedra web search
    #[serde(default = "default_true")]
    pub web_search: bool,

    /// Built-in daedra page fetch
    #[serde(default = "default_true")]
    pub fetch_page: bool,

    #[serde(default = "default_search_results")]
    pub search_results: usize,

    /// Per-call timeout applied by the tool invoker
    #[serde(default = "default_tool_timeout")]
    pub call_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_search_results() -> usize {
    5
}

fn default_tool_timeout() -> u64 {
    60
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            web_search: true,
            fetch_page: true,
            search_results: default_search_results(),
            call_timeout_secs: default_tool_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory reports are saved under
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("research_papers")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

// ============= Resolved Workflow Settings =============

/// Everything the orchestration engine needs from the configuration.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub model: String,
    pub max_steps: usize,
    pub plan_retry_limit: u32,
    pub step_timeout: Duration,
    pub plan_timeout: Duration,
    pub models: RoleModels,
    pub research: ResearchConfig,
    pub writer: WriterConfig,
    pub editor: EditorConfig,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        LyceumConfig::default().workflow_settings()
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Environment variable '{var}' has an invalid value '{value}'")]
    InvalidEnvOverride { var: String, value: String },
}

impl LyceumConfig {
    /// Load configuration from a TOML file, apply environment overrides and validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let mut config: LyceumConfig = toml::from_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load `path` when it exists, otherwise start from the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }

        info!("No configuration at {:?}; using defaults", path);
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `LYCEUM_MODEL`, `LYCEUM_MAX_STEPS` and the per-role `*_MODEL` variables.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("LYCEUM_MODEL").filter(|m| !m.trim().is_empty()) {
            self.workflow.model = model;
        }

        if let Some(raw) = lookup("LYCEUM_MAX_STEPS") {
            self.workflow.max_steps =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnvOverride {
                        var: "LYCEUM_MAX_STEPS".to_string(),
                        value: raw.clone(),
                    })?;
        }

        for role in ModelRole::ALL {
            if let Some(model) = lookup(role.env_var()).filter(|m| !m.trim().is_empty()) {
                *self.models.slot(role) = Some(model);
            }
        }
        Ok(())
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_with(|key| std::env::var(key).ok())
    }

    /// Validate, resolving environment variables through `lookup`.
    pub fn validate_with<F>(&self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let workflow = &self.workflow;

        if workflow.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "workflow.max_steps must be at least 1".to_string(),
            ));
        }
        if workflow.plan_retry_limit > MAX_PLAN_RETRY_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "workflow.plan_retry_limit must be at most {}",
                MAX_PLAN_RETRY_LIMIT
            )));
        }
        if workflow.step_timeout_secs == 0 || workflow.plan_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "workflow timeouts must be greater than zero".to_string(),
            ));
        }
        if workflow.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "workflow.model must not be empty".to_string(),
            ));
        }
        for role in ModelRole::ALL {
            if let Some(model) = self.models.get(role) {
                if model.trim().is_empty() {
                    return Err(ConfigError::ValidationError(format!(
                        "models.{} must not be empty",
                        role.as_str()
                    )));
                }
            }
        }

        if let ProviderConfig::OpenAI { api_key_env, .. } = &self.provider {
            if lookup(api_key_env).is_none() {
                return Err(ConfigError::MissingEnvVar(api_key_env.clone()));
            }
        }

        if self.research.max_tool_turns == 0 {
            return Err(ConfigError::ValidationError(
                "research.max_tool_turns must be at least 1".to_string(),
            ));
        }

        for (name, server) in &self.mcp_servers {
            if server.command.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "mcp_servers.{}.command must not be empty",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Resolve the settings handed to the orchestration engine
    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            model: self.workflow.model.clone(),
            max_steps: self.workflow.max_steps,
            plan_retry_limit: self.workflow.plan_retry_limit,
            step_timeout: Duration::from_secs(self.workflow.step_timeout_secs),
            plan_timeout: Duration::from_secs(self.workflow.plan_timeout_secs),
            models: self.models.clone(),
            research: self.research.clone(),
            writer: self.writer.clone(),
            editor: self.editor.clone(),
        }
    }

    /// Model configured for `role`
    pub fn model_for(&self, role: ModelRole) -> &str {
        self.models.for_role(role, &self.workflow.model)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ============= Configuration Manager =============

/// Thread-safe holder of the current configuration
pub struct ConfigManager {
    config: Arc<ArcSwap<LyceumConfig>>,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load the configuration at `path` (defaults when the file is absent)
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let config = LyceumConfig::load_or_default(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: Some(path),
        })
    }

    /// Create a config manager directly from a config (useful for testing)
    pub fn from_config(config: LyceumConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: None,
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<LyceumConfig> {
        self.config.load_full()
    }

    pub fn path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Re-read the file. On failure the previous configuration stays active.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.config_path else {
            return Ok(());
        };
        info!("Reloading configuration from {:?}", path);

        let new_config = LyceumConfig::load_or_default(path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }
}

impl Clone for ConfigManager {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            config_path: self.config_path.clone(),
        }
    }
}
