//! Pipeline stages.
//!
//! A stage reads a slice of the run state, invokes at most one external
//! collaborator, and returns a partial state update. No two stages write the
//! same field; `accumulated_results` only ever grows via the reducer's
//! append path. One file per collaborator-backed stage; the two pure
//! bookkeeping stages live here.

use crate::pipeline::state::{RunState, StateUpdate};
use crate::pipeline::transition::StageId;
use crate::types::Result;
use async_trait::async_trait;

pub mod brief;
pub mod clarify;
pub mod plan;
pub mod research;
pub mod write;

pub use brief::BriefStage;
pub use clarify::ClarifyStage;
pub use plan::PlanStage;
pub use research::ResearchStage;
pub use write::WriteStage;

/// One unit of pipeline work.
#[async_trait]
pub trait Stage: Send + Sync {
    fn id(&self) -> StageId;

    /// Produce a partial update from the current state. Must not mutate the
    /// state directly; the runner folds the update in via the reducer.
    async fn run(&self, state: &RunState) -> Result<StateUpdate>;
}

/// Appends the latest research result to the accumulated findings.
pub struct ExecuteTaskStage;

#[async_trait]
impl Stage for ExecuteTaskStage {
    fn id(&self) -> StageId {
        StageId::ExecuteTask
    }

    async fn run(&self, state: &RunState) -> Result<StateUpdate> {
        Ok(StateUpdate {
            appended_results: vec![state.last_result.clone()],
            ..Default::default()
        })
    }
}

/// Advances the research cursor. Kept separate from the research stage so
/// iterations can be replayed and tested in isolation.
pub struct IncrementIndexStage;

#[async_trait]
impl Stage for IncrementIndexStage {
    fn id(&self) -> StageId {
        StageId::IncrementIndex
    }

    async fn run(&self, state: &RunState) -> Result<StateUpdate> {
        Ok(StateUpdate {
            current_index: Some(state.current_index + 1),
            ..Default::default()
        })
    }
}

/// Slice the first JSON object out of a model response.
///
/// Models routinely wrap structured output in prose or ``` fences; the
/// payload between the outermost braces is what the stages parse.
pub(crate) fn extract_json(response: &str) -> &str {
    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => response.trim(),
    }
}
