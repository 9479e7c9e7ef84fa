//! CLI module for Lyceum
//!
//! Provides command-line interface parsing for the `lyceum` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;
pub mod report;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lyceum - multi-agent research orchestrator
///
/// Plans a research workflow for a topic, then runs it through researcher,
/// writer and editor agents to produce a Markdown report.
#[derive(Parser, Debug)]
#[command(
    name = "lyceum",
    version,
    about = "Lyceum - multi-agent research orchestrator",
    long_about = "Plans a research workflow for a topic with a language model, validates the plan\n\
                  against the available capabilities (research, write, edit), and executes it\n\
                  step by step to produce a Markdown research report.",
    after_help = "EXAMPLES:\n    \
                  lyceum init                                  # Scaffold lyceum.toml\n    \
                  lyceum run \"graph neural networks\" --save    # Research and save a report\n    \
                  lyceum plan \"quantum error correction\"       # Show the plan only\n    \
                  lyceum tools                                 # List connected tools"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "lyceum.toml", global = true)]
    pub config: PathBuf,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a topic and print the report
    Run {
        /// The research topic
        topic: String,

        /// Save the final report under the configured output directory
        #[arg(short, long)]
        save: bool,

        /// Model for every role without an override
        #[arg(short, long, env = "LYCEUM_MODEL")]
        model: Option<String>,

        /// Ceiling on executed steps
        #[arg(long)]
        max_steps: Option<usize>,
    },

    /// Generate and print a plan without executing it
    Plan {
        /// The research topic
        topic: String,

        #[arg(short, long)]
        model: Option<String>,

        #[arg(long)]
        max_steps: Option<usize>,
    },

    /// Write a starter lyceum.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Backend provider to configure (ollama or openai)
        #[arg(long, default_value = "ollama")]
        provider: String,
    },

    /// Show configuration information
    Config {
        /// Print the effective configuration as TOML
        #[arg(short = 'f', long)]
        full: bool,

        /// Only validate the configuration file
        #[arg(long)]
        validate: bool,
    },

    /// List the tools available to the researcher
    Tools,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
