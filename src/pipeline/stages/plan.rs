use crate::llm::LLMClient;
use crate::pipeline::stages::{Stage, extract_json};
use crate::pipeline::state::{RunState, StateUpdate};
use crate::pipeline::transition::StageId;
use crate::types::{AppError, Result, ResearchPlan};
use async_trait::async_trait;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are a research supervisor. You break a research \
brief into ordered steps, each backed by one web search query.";

/// Supervisor stage: turns the brief into an index-aligned research plan.
///
/// Unlike the brief stage this one does NOT fail soft - a response that
/// cannot be parsed into equal-length `steps` and `queries` is a
/// [`AppError::SchemaValidation`] and aborts the run. Silently coercing a
/// broken plan would desynchronize the research loop.
pub struct PlanStage {
    llm: Arc<dyn LLMClient>,
}

impl PlanStage {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }
}

fn parse_plan(response: &str) -> Result<ResearchPlan> {
    let plan: ResearchPlan = serde_json::from_str(extract_json(response)).map_err(|e| {
        AppError::SchemaValidation(format!("research plan did not match schema: {}", e))
    })?;

    if plan.steps.len() != plan.queries.len() {
        return Err(AppError::SchemaValidation(format!(
            "research plan is misaligned: {} steps but {} queries",
            plan.steps.len(),
            plan.queries.len()
        )));
    }

    Ok(plan)
}

#[async_trait]
impl Stage for PlanStage {
    fn id(&self) -> StageId {
        StageId::Plan
    }

    async fn run(&self, state: &RunState) -> Result<StateUpdate> {
        let schema = schemars::schema_for!(ResearchPlan);
        let prompt = format!(
            r#"Create a step-by-step research plan for the following brief.

Brief: {}

Each step must come with exactly one web search query; `steps` and `queries`
must have the same length and be index-aligned.

Respond with JSON only, matching this schema:
{}"#,
            state.research_input(),
            serde_json::to_string_pretty(&schema).unwrap_or_default()
        );

        let response = self.llm.generate_with_system(SYSTEM_PROMPT, &prompt).await?;
        let plan = parse_plan(&response)?;

        tracing::debug!(steps = plan.steps.len(), "research plan ready");

        Ok(StateUpdate {
            plan: Some(plan.steps),
            queries: Some(plan.queries),
            current_index: Some(0),
            ..Default::default()
        })
    }
}
