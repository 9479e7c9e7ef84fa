//! Init command implementation
//!
//! Scaffolds a starter `lyceum.toml` and `.env.example`.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// lyceum.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// Backend provider to configure (ollama or openai)
    pub provider: String,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Lyceum");

    let base_path = &config.path;
    if let Err(e) = fs::create_dir_all(base_path) {
        output.error(&format!("Failed to create {}: {}", base_path.display(), e));
        return InitResult::Error(e.to_string());
    }

    let config_path = base_path.join(crate::utils::toml_config::DEFAULT_CONFIG_FILE);
    if config_path.exists() && !config.force {
        output.warning("lyceum.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    if let Err(e) = write_file(&config_path, &generate_lyceum_toml(&config.provider), true) {
        output.error(&format!("Failed to create lyceum.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "lyceum.toml");

    let env_path = base_path.join(".env.example");
    match write_file(&env_path, &generate_env_example(), config.force) {
        Ok(true) => output.created("env", ".env.example"),
        Ok(false) => output.skipped(".env.example", "already exists"),
        Err(e) => {
            output.error(&format!("Failed to create .env.example: {}", e));
            return InitResult::Error(e.to_string());
        }
    }

    output.complete("Lyceum initialized!");
    output.header("Next Steps");
    output.newline();
    if config.provider == "openai" {
        output.info("1. Set your API key:");
        output.command("cp .env.example .env  # then set OPENAI_API_KEY");
    } else {
        output.info("1. Start Ollama and pull a model:");
        output.command("ollama serve");
        output.command("ollama pull llama3.2");
    }
    output.newline();
    output.info("2. Research a topic:");
    output.command("lyceum run \"graph neural networks\" --save");

    InitResult::Success
}

/// Write `content` unless the file exists and `force` is off. Returns whether it wrote.
fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    fs::write(path, content)?;
    Ok(true)
}

fn generate_lyceum_toml(provider: &str) -> String {
    let (provider_section, model) = if provider == "openai" {
        (
            r#"[provider]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1""#,
            "gpt-4o-mini",
        )
    } else {
        (
            r#"[provider]
type = "ollama"
base_url = "http://localhost:11434""#,
            "llama3.2",
        )
    };

    format!(
        r#"# Lyceum configuration

[workflow]
model = "{model}"
max_steps = 10
plan_retry_limit = 2
step_timeout_secs = 300
plan_timeout_secs = 120
log_level = "info"

# Per-role model overrides
[models]
# planner = "{model}"
# research = "{model}"

{provider_section}

[research]
max_tool_turns = 6
max_tool_result_chars = 10000
max_context_chars = 3000

[writer]
max_context_chars = 5000

[tools]
web_search = true
fetch_page = true
search_results = 5
call_timeout_secs = 60

[output]
dir = "research_papers"

# stdio MCP servers (requires the `mcp` feature)
# [mcp_servers.research]
# command = "uv"
# args = ["run", "research_mcp_server.py"]
"#
    )
}

fn generate_env_example() -> String {
    r#"# Lyceum Environment Variables
# Copy this file to .env and fill in the values.

# Logging level (trace, debug, info, warn, error)
RUST_LOG=info,lyceum=debug

# OpenAI API key (if using the openai provider)
# OPENAI_API_KEY=sk-...

# Model overrides
# LYCEUM_MODEL=llama3.2
# PLANNER_MODEL=
# RESEARCH_MODEL=
# WRITER_MODEL=
# EDITOR_MODEL=
# LYCEUM_MAX_STEPS=10
"#
    .to_string()
}
