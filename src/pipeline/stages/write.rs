use crate::llm::LLMClient;
use crate::pipeline::stages::Stage;
use crate::pipeline::state::{RunState, StateUpdate};
use crate::pipeline::transition::StageId;
use crate::types::Result;
use async_trait::async_trait;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are a professional report writer. You turn research \
findings into clear, well-structured, professionally formatted reports.";

/// Terminal stage: synthesizes the accumulated findings into the final
/// comprehensive report, citing the collected source URLs.
pub struct WriteStage {
    llm: Arc<dyn LLMClient>,
}

impl WriteStage {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }
}

/// Collect the unique source URLs cited across the findings, sorted.
fn extract_source_urls(findings: &[String]) -> Vec<String> {
    let mut urls: Vec<String> = findings
        .iter()
        .flat_map(|finding| finding.lines())
        .filter_map(|line| line.strip_prefix("URL: "))
        .map(str::to_string)
        .collect();
    urls.sort();
    urls.dedup();
    urls
}

#[async_trait]
impl Stage for WriteStage {
    fn id(&self) -> StageId {
        StageId::Write
    }

    async fn run(&self, state: &RunState) -> Result<StateUpdate> {
        let sources = extract_source_urls(&state.accumulated_results);

        let prompt = format!(
            r#"Write a comprehensive report answering the following research request:
{}

Findings, in research order:
{}

The report must have these sections:
1. **Introduction**: briefly introduce the topic.
2. **Key Findings**: the main points and data from the research.
3. **In-depth Analysis**: elaborate on the insights and trends found.
4. **Conclusion**: summarize and give a concluding thought.
5. **Sources**: list all source URLs.

Sources to cite:
{}"#,
            state.effective_request(),
            state.accumulated_results.join("\n\n"),
            sources.join("\n")
        );

        let report = self.llm.generate_with_system(SYSTEM_PROMPT, &prompt).await?;

        Ok(StateUpdate {
            report: Some(report),
            ..Default::default()
        })
    }
}
