//! Editor: critiques a draft and returns a revision.
//!
//! The backend either approves the draft (`VERDICT: APPROVED`) or returns a
//! critique plus a revised draft. An approved draft is passed through
//! unchanged, so editing a compliant draft is a fixed point.

use crate::agents::Agent;
use crate::llm::LLMClient;
use crate::memory::Context;
use crate::types::{AgentExecutionError, Step};
use crate::utils::toml_config::EditorConfig;
use async_trait::async_trait;

pub const CRITIQUE_HEADING: &str = "## Critique";
pub const REVISED_HEADING: &str = "## Revised Draft";
const APPROVED_MARKER: &str = "VERDICT: APPROVED";

/// Parsed editor reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub critique: String,
    /// `None` when the draft was approved or no revision was supplied
    pub revision: Option<String>,
}

fn is_verdict_line(line: &str) -> bool {
    line.trim()
        .trim_start_matches(&['*', '#', ' '][..])
        .to_uppercase()
        .starts_with(APPROVED_MARKER)
}

/// Split a backend reply into critique and revision.
///
/// The verdict only counts at the start of a line ahead of the revised draft.
/// A reply that carries neither heading nor verdict is taken to be the
/// revised document itself.
pub fn parse_review(reply: &str) -> Review {
    let (head, revision) = match reply.find(REVISED_HEADING) {
        Some(pos) => {
            let body = crate::utils::strip_code_fence(&reply[pos + REVISED_HEADING.len()..]);
            (&reply[..pos], (!body.is_empty()).then(|| body.to_string()))
        }
        None => (reply, None),
    };
    let approved = head.lines().any(is_verdict_line);

    if revision.is_none() && !approved && !head.contains(CRITIQUE_HEADING) {
        let body = crate::utils::strip_code_fence(reply);
        return Review {
            critique: String::new(),
            revision: (!body.is_empty()).then(|| body.to_string()),
        };
    }

    let critique = head
        .replacen(CRITIQUE_HEADING, "", 1)
        .lines()
        .filter(|line| !is_verdict_line(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    Review {
        critique,
        revision: if approved { None } else { revision },
    }
}

pub struct EditorAgent {
    llm: Box<dyn LLMClient>,
    config: EditorConfig,
}

impl EditorAgent {
    pub fn new(llm: Box<dyn LLMClient>, config: EditorConfig) -> Self {
        Self { llm, config }
    }

    fn build_prompt(&self, draft: &str, criteria: &str, step: &Step) -> String {
        format!(
            r#"Your task:
{task}

Criteria:
{criteria}

Draft:
{draft}

If the draft already satisfies every criterion, reply with the line "{APPROVED_MARKER}" followed by a short critique.
Otherwise reply in exactly this form:
{CRITIQUE_HEADING}
<short critique>

{REVISED_HEADING}
<the complete revised draft in Markdown>"#,
            task = step.description,
        )
    }
}

#[async_trait]
impl Agent for EditorAgent {
    async fn execute(
        &self,
        step: &Step,
        context: &Context,
    ) -> std::result::Result<String, AgentExecutionError> {
        let draft = step
            .arg("draft")
            .map(str::to_string)
            .or_else(|| context.latest_draft.clone())
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| AgentExecutionError::new(self.name(), "no draft available to edit"))?;
        let criteria = step.arg("criteria").unwrap_or(&self.config.criteria);

        let reply = self
            .llm
            .generate_with_system(&self.system_prompt(), &self.build_prompt(&draft, criteria, step))
            .await
            .map_err(|e| AgentExecutionError::new(self.name(), e.to_string()))?;

        if reply.trim().is_empty() {
            return Err(AgentExecutionError::new(
                self.name(),
                "backend returned an empty review",
            ));
        }

        let review = parse_review(&reply);
        let critique = match (review.critique.is_empty(), &review.revision) {
            (false, _) => review.critique,
            (true, Some(_)) => "Revised without a written critique.".to_string(),
            (true, None) => "The draft meets the criteria.".to_string(),
        };
        let revised = review.revision.unwrap_or(draft);

        Ok(format!(
            "{}\n{}\n\n{}\n{}",
            CRITIQUE_HEADING, critique, REVISED_HEADING, revised
        ))
    }

    fn name(&self) -> &str {
        "editor"
    }

    fn system_prompt(&self) -> String {
        "You are an editor agent. Reflect on, critique and improve drafts by analyzing clarity, \
         structure, coherence and academic quality. Only change what the criteria require."
            .to_string()
    }

    /// The revised draft section of the editor's output.
    fn artifact(&self, output: &str) -> Option<String> {
        let pos = output.find(REVISED_HEADING)?;
        let revised = output[pos + REVISED_HEADING.len()..].trim();
        (!revised.is_empty()).then(|| revised.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMResponse;
    use crate::types::{Result, ToolDefinition};

    struct Reply(String);

    #[async_trait]
    impl LLMClient for Reply {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }

        async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
            self.generate(prompt).await
        }

        async fn generate_with_tools(
            &self,
            prompt: &str,
            _tools: &[ToolDefinition],
        ) -> Result<LLMResponse> {
            Ok(LLMResponse {
                content: self.generate(prompt).await?,
                tool_calls: vec![],
                finish_reason: "stop".to_string(),
            })
        }

        fn model_name(&self) -> &str {
            "reply"
        }
    }

    fn editor(reply: &str) -> EditorAgent {
        EditorAgent::new(Box::new(Reply(reply.to_string())), EditorConfig::default())
    }

    fn with_draft(draft: &str) -> Context {
        Context {
            topic: "t".to_string(),
            summary: String::new(),
            latest_draft: Some(draft.to_string()),
            prior_steps: 1,
        }
    }

    #[test]
    fn test_parse_review_with_revision() {
        let review = parse_review("## Critique\nToo short.\n\n## Revised Draft\n# Better\nLonger.");
        assert_eq!(review.critique, "Too short.");
        assert_eq!(review.revision.as_deref(), Some("# Better\nLonger."));
    }

    #[test]
    fn test_parse_review_approved_ignores_revision() {
        let review = parse_review("VERDICT: APPROVED\nClear and complete.\n## Revised Draft\nsomething");
        assert_eq!(review.critique, "Clear and complete.");
        assert_eq!(review.revision, None);
    }

    #[test]
    fn test_verdict_phrase_inside_revision_is_not_approval() {
        let review = parse_review(
            "## Critique\nNeeds work.\n\n## Revised Draft\n# Notes\nThe committee's verdict: approved the budget.",
        );
        assert_eq!(review.critique, "Needs work.");
        assert_eq!(
            review.revision.as_deref(),
            Some("# Notes\nThe committee's verdict: approved the budget.")
        );
    }

    #[test]
    fn test_verdict_must_open_a_line() {
        let review = parse_review("## Critique\nOur verdict: approved? Not yet.\n## Revised Draft\n# v2");
        assert_eq!(review.revision.as_deref(), Some("# v2"));

        let review = parse_review("**Verdict: Approved**\nReads well.");
        assert_eq!(review.revision, None);
        assert_eq!(review.critique, "Reads well.");
    }

    #[test]
    fn test_unformatted_reply_is_the_revision() {
        let review = parse_review("# Report\n\nA fully rewritten, improved report body.");
        assert_eq!(review.critique, "");
        assert_eq!(
            review.revision.as_deref(),
            Some("# Report\n\nA fully rewritten, improved report body.")
        );
    }

    #[tokio::test]
    async fn test_unformatted_rewrite_is_kept() {
        let agent = editor("# Report\n\nA fully rewritten, improved report body.");
        let output = agent
            .execute(&Step::new("edit", "polish"), &with_draft("# Report\n\nOld body."))
            .await
            .unwrap();

        assert!(output.contains("Revised without a written critique."));
        assert_eq!(
            agent.artifact(&output).as_deref(),
            Some("# Report\n\nA fully rewritten, improved report body.")
        );
    }

    #[tokio::test]
    async fn test_empty_reply_is_agent_error() {
        let agent = editor("  ");
        let err = agent
            .execute(&Step::new("edit", "polish"), &with_draft("# Doc"))
            .await
            .unwrap_err();
        assert!(err.message.contains("empty review"));
    }

    #[tokio::test]
    async fn test_revision_replaces_draft() {
        let agent = editor("## Critique\nNeeds a conclusion.\n\n## Revised Draft\n# Doc\n\n## Conclusion\nDone.");
        let output = agent
            .execute(&Step::new("edit", "polish"), &with_draft("# Doc"))
            .await
            .unwrap();

        assert!(output.starts_with("## Critique\nNeeds a conclusion."));
        assert_eq!(
            agent.artifact(&output).as_deref(),
            Some("# Doc\n\n## Conclusion\nDone.")
        );
    }

    #[tokio::test]
    async fn test_approved_draft_is_fixed_point() {
        let agent = editor("VERDICT: APPROVED\nNothing to change.");
        let draft = "# Report\n\nAll sections present.";

        let first = agent
            .execute(&Step::new("edit", "review"), &with_draft(draft))
            .await
            .unwrap();
        let first_artifact = agent.artifact(&first).unwrap();
        let second = agent
            .execute(&Step::new("edit", "review"), &with_draft(&first_artifact))
            .await
            .unwrap();

        assert_eq!(first_artifact, draft);
        assert_eq!(agent.artifact(&second).unwrap(), draft);
    }

    #[tokio::test]
    async fn test_draft_arg_takes_precedence() {
        let agent = editor("VERDICT: APPROVED");
        let output = agent
            .execute(
                &Step::new("edit", "review").with_arg("draft", "from args"),
                &with_draft("from context"),
            )
            .await
            .unwrap();
        assert_eq!(agent.artifact(&output).as_deref(), Some("from args"));
        assert!(output.contains("The draft meets the criteria."));
    }

    #[tokio::test]
    async fn test_missing_draft_is_agent_error() {
        let agent = editor("VERDICT: APPROVED");
        let err = agent
            .execute(&Step::new("edit", "review"), &Context::empty("t"))
            .await
            .unwrap_err();
        assert!(err.message.contains("no draft"));
    }
}
