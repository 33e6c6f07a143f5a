use crate::pipeline::stages::Stage;
use crate::pipeline::state::{RunState, StateUpdate};
use crate::pipeline::transition::StageId;
use crate::search::SearchClient;
use crate::types::{AppError, Result, SearchHit};
use async_trait::async_trait;
use std::sync::Arc;

/// Runs the current plan query against the search collaborator.
///
/// Writes only `last_result`; advancing the cursor is the increment stage's
/// job, and folding the result into the accumulated findings is the
/// execute-task stage's.
pub struct ResearchStage {
    search: Arc<dyn SearchClient>,
    max_results: usize,
}

impl ResearchStage {
    pub fn new(search: Arc<dyn SearchClient>, max_results: usize) -> Self {
        Self {
            search,
            max_results,
        }
    }
}

fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results found for \"{}\".", query);
    }

    hits.iter()
        .map(|hit| format!("URL: {}\nContent: {}", hit.url, hit.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Stage for ResearchStage {
    fn id(&self) -> StageId {
        StageId::Research
    }

    async fn run(&self, state: &RunState) -> Result<StateUpdate> {
        let query = state.queries.get(state.current_index).ok_or_else(|| {
            AppError::Internal(format!(
                "research routed past the last query (index {} of {})",
                state.current_index,
                state.queries.len()
            ))
        })?;

        tracing::info!(
            iteration = state.current_index + 1,
            total = state.plan.len(),
            %query,
            "research iteration"
        );

        let hits = self.search.search(query, self.max_results).await?;

        Ok(StateUpdate {
            last_result: Some(format_hits(query, &hits)),
            ..Default::default()
        })
    }
}
