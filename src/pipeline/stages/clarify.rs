use crate::llm::LLMClient;
use crate::pipeline::stages::{Stage, extract_json};
use crate::pipeline::state::{RunState, StateUpdate};
use crate::pipeline::transition::StageId;
use crate::types::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are a research scoping assistant. You decide \
whether a research request is specific enough to act on, and improve it when it is.";

/// Decision returned by the scoping call.
#[derive(Debug, Deserialize, JsonSchema)]
struct ClarifyDecision {
    clarification_needed: bool,
    #[serde(default)]
    clarification_question: Option<String>,
    #[serde(default)]
    clarified_request: Option<String>,
}

/// Judges whether the request is ambiguous. Either poses one clarification
/// question (suspending the run until the client answers) or rewrites the
/// request into a sharper one.
pub struct ClarifyStage {
    llm: Arc<dyn LLMClient>,
}

impl ClarifyStage {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }
}

fn parse_decision(response: &str) -> Option<ClarifyDecision> {
    serde_json::from_str(extract_json(response)).ok()
}

#[async_trait]
impl Stage for ClarifyStage {
    fn id(&self) -> StageId {
        StageId::Clarify
    }

    async fn run(&self, state: &RunState) -> Result<StateUpdate> {
        let schema = schemars::schema_for!(ClarifyDecision);
        let prompt = format!(
            r#"Decide whether the following research request needs clarification before work starts.

Request: {}

If it is too vague or ambiguous to research well, ask ONE clarification question.
Otherwise rewrite it as a precise, self-contained research request.

Respond with JSON only, matching this schema:
{}"#,
            state.request,
            serde_json::to_string_pretty(&schema).unwrap_or_default()
        );

        let response = self.llm.generate_with_system(SYSTEM_PROMPT, &prompt).await?;

        // Scoping is advisory; an unparseable decision must not kill the run.
        let update = match parse_decision(&response) {
            Some(decision) if decision.clarification_needed => {
                let question = decision
                    .clarification_question
                    .filter(|q| !q.is_empty())
                    .unwrap_or_else(|| {
                        format!(
                            "Could you narrow down what you want to know about \"{}\"?",
                            state.request
                        )
                    });
                StateUpdate {
                    clarification_needed: Some(true),
                    clarification_question: Some(question),
                    ..Default::default()
                }
            }
            Some(decision) => StateUpdate {
                clarification_needed: Some(false),
                clarified_request: Some(
                    decision
                        .clarified_request
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| state.request.clone()),
                ),
                ..Default::default()
            },
            None => {
                tracing::warn!("clarify decision did not parse; proceeding with the raw request");
                StateUpdate {
                    clarification_needed: Some(false),
                    clarified_request: Some(state.request.clone()),
                    ..Default::default()
                }
            }
        };

        Ok(update)
    }
}
