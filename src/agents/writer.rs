use crate::agents::Agent;
use crate::llm::LLMClient;
use crate::memory::Context;
use crate::types::{AgentExecutionError, Step};
use crate::utils::toml_config::WriterConfig;
use async_trait::async_trait;

/// Section layout used when a step does not ask for one.
pub const DEFAULT_STRUCTURE: &str =
    "Introduction, Background/Methodology, Applications, Challenges, Conclusion";

/// Writer: turns accumulated findings into a Markdown document.
///
/// A pure text transform; the only way it fails is the backend failing.
pub struct WriterAgent {
    llm: Box<dyn LLMClient>,
    config: WriterConfig,
}

impl WriterAgent {
    pub fn new(llm: Box<dyn LLMClient>, config: WriterConfig) -> Self {
        Self { llm, config }
    }

    fn build_prompt(&self, step: &Step, context: &Context) -> String {
        let structure = step.arg("structure").unwrap_or(DEFAULT_STRUCTURE);
        let mut prompt = format!("Research topic: {}\n\n", context.topic);

        let draft = context.latest_draft.as_deref().unwrap_or("");
        let (summary_chars, draft_chars) = split_budget(
            self.config.max_context_chars,
            context.summary.chars().count(),
            draft.chars().count(),
        );

        if !context.is_empty() {
            prompt.push_str("Context from previous steps:\n");
            prompt.push_str(&context.summary_within(summary_chars));
            prompt.push_str("\n\n");
        }
        if !draft.is_empty() {
            let note = format!("\n\n[Draft truncated to {} characters]", draft_chars);
            prompt.push_str("Current draft (build on it rather than starting over):\n");
            prompt.push_str(&crate::utils::truncate_chars(draft, draft_chars, &note));
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!(
            "Your task:\n{}\n\nStructure the document with these sections: {}.\n\
             Return the document as Markdown only.",
            step.description, structure
        ));
        prompt
    }
}

/// Share `budget` characters between the history summary and the current draft.
///
/// Both fit untouched when they can. Otherwise neither is squeezed below half
/// the budget unless the other leaves room, and the two never exceed it together.
fn split_budget(budget: usize, summary_len: usize, draft_len: usize) -> (usize, usize) {
    if summary_len + draft_len <= budget {
        return (summary_len, draft_len);
    }
    let draft_share = draft_len.min((budget / 2).max(budget.saturating_sub(summary_len)));
    (budget - draft_share, draft_share)
}

#[async_trait]
impl Agent for WriterAgent {
    async fn execute(
        &self,
        step: &Step,
        context: &Context,
    ) -> std::result::Result<String, AgentExecutionError> {
        let prompt = self.build_prompt(step, context);
        let draft = self
            .llm
            .generate_with_system(&self.system_prompt(), &prompt)
            .await
            .map_err(|e| AgentExecutionError::new(self.name(), e.to_string()))?;

        let draft = crate::utils::strip_code_fence(&draft).to_string();
        if draft.is_empty() {
            return Err(AgentExecutionError::new(
                self.name(),
                "backend returned an empty draft",
            ));
        }
        Ok(draft)
    }

    fn name(&self) -> &str {
        "writer"
    }

    fn system_prompt(&self) -> String {
        "You are a writing agent specialized in producing clear, well-structured academic and \
         technical content. Draft, expand, refine or summarize text according to the task. \
         When synthesizing research, use all of the findings provided, cite the sources they \
         name, and keep the report thorough and well organized."
            .to_string()
    }

    fn artifact(&self, output: &str) -> Option<String> {
        let trimmed = output.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}
