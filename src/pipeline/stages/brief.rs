use crate::llm::LLMClient;
use crate::pipeline::stages::{Stage, extract_json};
use crate::pipeline::state::{RunState, StateUpdate};
use crate::pipeline::transition::StageId;
use crate::types::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are a research brief generator. Given a research \
request, you synthesize a detailed brief describing scope, objectives, and constraints.";

#[derive(Debug, Deserialize, JsonSchema)]
struct BriefOutput {
    brief: String,
}

/// Expands the clarified request into a research brief.
///
/// Fails soft: if the collaborator's response is not the expected JSON, the
/// raw response text is used as the brief rather than aborting the run.
pub struct BriefStage {
    llm: Arc<dyn LLMClient>,
}

impl BriefStage {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }
}

fn parse_brief(response: &str) -> String {
    match serde_json::from_str::<BriefOutput>(extract_json(response)) {
        Ok(output) if !output.brief.is_empty() => output.brief,
        _ => response.trim().to_string(),
    }
}

#[async_trait]
impl Stage for BriefStage {
    fn id(&self) -> StageId {
        StageId::Brief
    }

    async fn run(&self, state: &RunState) -> Result<StateUpdate> {
        let schema = schemars::schema_for!(BriefOutput);
        let prompt = format!(
            r#"Write a research brief for the following request, covering scope, objectives and constraints.

Request: {}

Respond with JSON only, matching this schema:
{}"#,
            state.effective_request(),
            serde_json::to_string_pretty(&schema).unwrap_or_default()
        );

        let response = self.llm.generate_with_system(SYSTEM_PROMPT, &prompt).await?;

        Ok(StateUpdate {
            brief: Some(parse_brief(&response)),
            ..Default::default()
        })
    }
}
