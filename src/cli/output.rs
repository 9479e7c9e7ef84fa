//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the Lyceum CLI.

use crate::types::{ExecutionRecord, Plan, StepStatus, TerminationReason, WorkflowResult};
use owo_colors::OwoColorize;

/// How much of each step's output the history listing shows.
const PREVIEW_CHARS: usize = 400;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the Lyceum banner
    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!(
                "\n   {} {}\n   {}\n",
                "Lyceum".bright_cyan().bold(),
                version.dimmed(),
                "multi-agent research orchestrator".bright_white()
            );
        } else {
            println!("\n   Lyceum {}\n   multi-agent research orchestrator\n", version);
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a file creation message
    pub fn created(&self, file_type: &str, path: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "✓".green().bold(),
                file_type.dimmed(),
                path.bright_white()
            );
        } else {
            println!("  [CREATED] {} {}", file_type, path);
        }
    }

    /// Print a file skipped message
    pub fn skipped(&self, path: &str, reason: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "○".yellow(),
                path.dimmed(),
                format!("({})", reason).yellow()
            );
        } else {
            println!("  [SKIPPED] {} ({})", path, reason);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a subheader
    pub fn subheader(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.cyan().bold());
        } else {
            println!("\n  --- {} ---", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a command suggestion
    pub fn command(&self, cmd: &str) {
        if self.colored {
            println!("     {}", format!("$ {}", cmd).bright_cyan());
        } else {
            println!("     $ {}", cmd);
        }
    }

    /// Print completion message
    pub fn complete(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "🚀".green(), message.bright_green().bold());
        } else {
            println!("\n  [DONE] {}", message);
        }
    }

    /// Print a plan, one numbered line per step
    pub fn plan(&self, plan: &Plan) {
        self.header("Plan");
        for (i, step) in plan.steps().iter().enumerate() {
            let number = format!("{}.", i + 1);
            if self.colored {
                println!(
                    "    {} {} {}",
                    number.dimmed(),
                    step.verb.bright_cyan().bold(),
                    step.description
                );
            } else {
                println!("    {} [{}] {}", number, step.verb, step.description);
            }
        }
    }

    /// Print one execution record
    pub fn record(&self, record: &ExecutionRecord) {
        let label = format!("[{}] {}", record.step_index + 1, record.agent_name);
        let timing = format!("{} ms", record.duration_ms);
        let preview = crate::utils::truncate_chars(record.output.trim(), PREVIEW_CHARS, " ...");

        match (self.colored, record.status) {
            (true, StepStatus::Ok) => println!(
                "\n  {} {} {}",
                label.bright_white().bold(),
                "ok".green().bold(),
                timing.dimmed()
            ),
            (true, StepStatus::Failed) => println!(
                "\n  {} {} {}",
                label.bright_white().bold(),
                "failed".red().bold(),
                timing.dimmed()
            ),
            (false, StepStatus::Ok) => println!("\n  {} ok {}", label, timing),
            (false, StepStatus::Failed) => println!("\n  {} failed {}", label, timing),
        }
        for line in preview.lines() {
            println!("    {}", line);
        }
    }

    /// Print the execution history and final artifact of a run
    pub fn workflow_result(&self, result: &WorkflowResult) {
        self.header("Execution History");
        for record in result.history.records() {
            self.record(record);
        }

        match result.terminated_reason {
            TerminationReason::Completed => {}
            TerminationReason::StepBudgetExceeded => {
                self.warning("Stopped early: step budget exhausted")
            }
            TerminationReason::ExplicitStop => self.warning("Stopped early on request"),
        }
        let failed = result.history.failed().count();
        if failed > 0 {
            self.warning(&format!(
                "{} of {} steps failed; the report is best effort",
                failed,
                result.history.len()
            ));
        }

        self.header("Final Report");
        println!("\n{}\n", result.final_artifact);
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}
