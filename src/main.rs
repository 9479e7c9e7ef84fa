//! Lyceum CLI Entry Point
//!
//! - `lyceum run <topic>` - Plan and execute a research workflow
//! - `lyceum plan <topic>` - Show the validated plan only
//! - `lyceum init` - Scaffold lyceum.toml
//! - `lyceum config` - Show or validate the configuration
//! - `lyceum tools` - List the tools the researcher can call

use anyhow::Context;
use lyceum::cli::init::{self, InitConfig, InitResult};
use lyceum::cli::output::Output;
use lyceum::cli::report::save_report;
use lyceum::cli::{Cli, Commands};
use lyceum::utils::toml_config::{ConfigManager, LyceumConfig, ModelRole, WorkflowSettings};
use lyceum::{LLMClientFactory, LocalToolConnection, OrchestrationEngine, ToolInvoker};
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Commands::Init {
        path,
        force,
        provider,
    } = &cli.command
    {
        let config = InitConfig {
            path: path.clone(),
            force: *force,
            provider: provider.clone(),
        };
        return match init::run(config, &output) {
            InitResult::Success | InitResult::AlreadyExists => Ok(()),
            InitResult::Error(e) => Err(anyhow::anyhow!(e)),
        };
    }

    if let Commands::Config { full, validate } = &cli.command {
        return show_config(&cli, *full, *validate, &output);
    }

    let manager = ConfigManager::new(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let config = manager.config();
    init_tracing(&config.workflow.log_level, cli.verbose, cli.json);

    match cli.command {
        Commands::Tools => {
            let invoker = build_invoker(&config).await?;
            output.header("Available Tools");
            let definitions = invoker.tool_definitions();
            if definitions.is_empty() {
                output.warning("No tools are connected");
            }
            for def in definitions {
                output.kv(&def.name, &def.description);
            }
            invoker.disconnect_all().await;
            Ok(())
        }

        Commands::Plan {
            topic,
            model,
            max_steps,
        } => {
            let settings = with_cli_overrides(config.workflow_settings(), model, max_steps);
            let engine = OrchestrationEngine::new(
                Arc::new(LLMClientFactory::new(config.provider.clone())),
                Arc::new(ToolInvoker::new()),
                settings,
            );

            let settings = engine.settings();
            let plan = engine
                .generate_plan(&topic, &settings.model, settings.max_steps)
                .await
                .context("planning failed")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                output.plan(&plan);
            }
            Ok(())
        }

        Commands::Run {
            topic,
            save,
            model,
            max_steps,
        } => {
            let invoker = build_invoker(&config).await?;
            let engine = Arc::new(OrchestrationEngine::new(
                Arc::new(LLMClientFactory::new(config.provider.clone())),
                Arc::new(invoker),
                with_cli_overrides(config.workflow_settings(), model, max_steps),
            ));

            let interrupt = {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        let runs = engine.cancel_all();
                        warn!(runs, "Interrupted; stopping after the current step");
                    }
                })
            };

            if !cli.json {
                output.banner();
                output.kv("Topic", &topic);
                output.kv("Model", &engine.settings().model);
                output.kv("Max steps", &engine.settings().max_steps.to_string());
            }
            let outcome = engine.run_configured(&topic).await;
            interrupt.abort();
            engine.tools().disconnect_all().await;

            let result = outcome.context("research workflow aborted")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                output.workflow_result(&result);
            }

            if save {
                let path = save_report(&config.output.dir, &topic, &result.final_artifact)
                    .context("failed to save report")?;
                info!(path = %path.display(), "Report saved");
                output.success(&format!("Report saved to {}", path.display()));
            }
            Ok(())
        }

        Commands::Init { .. } | Commands::Config { .. } => Ok(()),
    }
}

fn with_cli_overrides(
    mut settings: WorkflowSettings,
    model: Option<String>,
    max_steps: Option<usize>,
) -> WorkflowSettings {
    if let Some(model) = model {
        settings.model = model;
    }
    if let Some(max_steps) = max_steps {
        settings.max_steps = max_steps;
    }
    settings
}

fn show_config(cli: &Cli, full: bool, validate: bool, output: &Output) -> anyhow::Result<()> {
    let config = match LyceumConfig::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            output.error(&format!("{}: {}", cli.config.display(), e));
            return Err(e.into());
        }
    };

    if validate {
        output.success(&format!("{} is valid", cli.config.display()));
        return Ok(());
    }
    if full {
        println!("{}", config.to_toml_string()?);
        return Ok(());
    }

    output.header("Configuration");
    output.kv("File", &cli.config.display().to_string());
    output.kv("Max steps", &config.workflow.max_steps.to_string());
    output.kv("Plan retries", &config.workflow.plan_retry_limit.to_string());
    output.kv(
        "Timeouts",
        &format!(
            "plan {}s, step {}s",
            config.workflow.plan_timeout_secs, config.workflow.step_timeout_secs
        ),
    );

    output.subheader("Models");
    for role in ModelRole::ALL {
        output.kv(role.as_str(), config.model_for(role));
    }

    output.subheader("Tool servers");
    if config.mcp_servers.is_empty() {
        output.list_item("(none)");
    }
    for (name, server) in &config.mcp_servers {
        output.list_item(&format!("{}: {} {}", name, server.command, server.args.join(" ")));
    }
    Ok(())
}

fn init_tracing(log_level: &str, verbose: bool, json: bool) {
    let default_directive = if verbose {
        "debug".to_string()
    } else {
        format!("warn,lyceum={}", log_level)
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

/// Connect the built-in tools and every configured MCP server.
async fn build_invoker(config: &LyceumConfig) -> anyhow::Result<ToolInvoker> {
    let mut invoker =
        ToolInvoker::new().with_call_timeout(Duration::from_secs(config.tools.call_timeout_secs));

    let local = LocalToolConnection::with_builtin_tools(
        config.tools.web_search,
        config.tools.fetch_page,
        config.tools.search_results,
    );
    if !local.is_empty() {
        invoker.attach(Arc::new(local)).await?;
    }

    #[cfg(feature = "mcp")]
    for (name, server) in &config.mcp_servers {
        match lyceum::mcp::McpToolConnection::connect(name, server).await {
            Ok(connection) => {
                invoker.attach(Arc::new(connection)).await?;
            }
            Err(e) => warn!(server = %name, error = %e, "Skipping MCP server"),
        }
    }

    #[cfg(not(feature = "mcp"))]
    if !config.mcp_servers.is_empty() {
        warn!(
            servers = config.mcp_servers.len(),
            "MCP servers are configured but the 'mcp' feature is disabled"
        );
    }

    Ok(invoker)
}
