//! Web search collaborator.
//!
//! The pipeline treats search as an opaque, fallible lookup: query in,
//! ordered results out. The [`SearchClient`] trait is the injection seam;
//! the default implementation is backed by the daedra crate, which uses
//! DuckDuckGo as the search backend.

use crate::types::{AppError, Result, SearchHit};
use async_trait::async_trait;

/// Web search abstraction used by the research stage.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run a query and return up to `limit` results, most relevant first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

/// Web search powered by daedra.
pub struct DaedraSearchClient;

impl DaedraSearchClient {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DaedraSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchClient for DaedraSearchClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let search_args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: limit,
                ..Default::default()
            }),
        };

        let response = daedra::tools::search::perform_search(&search_args)
            .await
            .map_err(|e| AppError::Collaborator(format!("Search failed: {}", e)))?;

        Ok(response
            .data
            .iter()
            .map(|r| SearchHit {
                url: r.url.clone(),
                title: r.title.clone(),
                content: r.description.clone(),
            })
            .collect())
    }
}
