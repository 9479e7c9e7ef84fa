//! Context folding for agent steps.
//!
//! Agents never see the [`History`](crate::types::History) itself. Before each
//! step the engine folds the records produced so far into a [`Context`], a
//! read-only snapshot that agents may trim to their own character budget.

use crate::types::{ExecutionRecord, StepStatus};

/// Default character budget for the researcher's view of prior work.
pub const DEFAULT_RESEARCH_CONTEXT_CHARS: usize = 3000;

/// Default character budget for the writer's view of prior work.
pub const DEFAULT_WRITER_CONTEXT_CHARS: usize = 5000;

/// Snapshot of prior work handed to an agent for one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    /// Research topic of the run
    pub topic: String,
    /// Text fold of every record before the current step
    pub summary: String,
    /// Most recent draft produced by a drafting agent, if any
    pub latest_draft: Option<String>,
    /// Number of records folded into `summary`
    pub prior_steps: usize,
}

impl Context {
    /// Context for the first step of a run.
    pub fn empty(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prior_steps == 0
    }

    /// The summary cut to `max_chars`, with a note when something was dropped.
    pub fn summary_within(&self, max_chars: usize) -> String {
        let note = format!(
            "\n\n[Context truncated to {} characters; earlier findings may be incomplete]",
            max_chars
        );
        crate::utils::truncate_chars(&self.summary, max_chars, &note)
    }
}

/// Render one record the way agents see it.
pub fn format_record(record: &ExecutionRecord) -> String {
    let marker = match record.status {
        StepStatus::Ok => "",
        StepStatus::Failed => " (failed)",
    };
    format!(
        "Step {} executed by {}{}:\n{}",
        record.step_index + 1,
        record.agent_name,
        marker,
        record.output
    )
}

/// Fold `records` into a [`Context`].
///
/// Only the records passed in are read; the caller hands over exactly the
/// prefix of the history that precedes the step being executed.
pub fn build_context(
    topic: &str,
    records: &[ExecutionRecord],
    latest_draft: Option<String>,
) -> Context {
    let summary = records
        .iter()
        .map(format_record)
        .collect::<Vec<_>>()
        .join("\n\n");

    Context {
        topic: topic.to_string(),
        summary,
        latest_draft,
        prior_steps: records.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(index: usize, agent: &str, output: &str, status: StepStatus) -> ExecutionRecord {
        ExecutionRecord {
            step_index: index,
            verb: "research".to_string(),
            agent_name: agent.to_string(),
            output: output.to_string(),
            status,
            started_at: Utc::now(),
            duration_ms: 1,
        }
    }

    #[test]
    fn test_empty_context() {
        let context = Context::empty("graph neural networks");
        assert!(context.is_empty());
        assert_eq!(context.topic, "graph neural networks");
        assert!(context.summary.is_empty());
        assert!(context.latest_draft.is_none());
    }

    #[test]
    fn test_build_context_numbers_steps_from_one() {
        let records = vec![
            record(0, "researcher", "found 3 papers", StepStatus::Ok),
            record(1, "writer", "draft v1", StepStatus::Ok),
        ];
        let context = build_context("gnn", &records, Some("draft v1".to_string()));

        assert_eq!(context.prior_steps, 2);
        assert_eq!(
            context.summary,
            "Step 1 executed by researcher:\nfound 3 papers\n\nStep 2 executed by writer:\ndraft v1"
        );
        assert_eq!(context.latest_draft.as_deref(), Some("draft v1"));
    }

    #[test]
    fn test_failed_records_are_marked() {
        let records = vec![record(0, "researcher", "timed out", StepStatus::Failed)];
        let context = build_context("gnn", &records, None);
        assert!(context.summary.starts_with("Step 1 executed by researcher (failed):"));
    }

    #[test]
    fn test_summary_within_budget() {
        let records = vec![record(0, "researcher", &"x".repeat(50), StepStatus::Ok)];
        let context = build_context("gnn", &records, None);

        let full = context.summary_within(10_000);
        assert_eq!(full, context.summary);

        let cut = context.summary_within(20);
        assert!(cut.starts_with(&context.summary[..20]));
        assert!(cut.contains("[Context truncated to 20 characters"));
    }
}
