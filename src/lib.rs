//! # A.T.L.A.S - Agentic Topic & Literature Analysis Server
//!
//! A staged deep-research pipeline server built in Rust: given a topic, it
//! clarifies scope, writes a brief, plans index-aligned search queries,
//! iterates web research, and synthesizes a cited report - streaming
//! per-stage progress over a WebSocket.
//!
//! ## Overview
//!
//! A.T.L.A.S can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `atlas-server` binary
//! 2. **As a library** - Drive [`pipeline::PipelineRunner`] directly with
//!    your own collaborator implementations
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use atlas::{DaedraSearchClient, LLMClientFactory, PipelineRunner, Provider, RunnerSettings};
//! use atlas::pipeline::RunOptions;
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use uuid::Uuid;
//!
//! let factory = LLMClientFactory::new(Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! });
//! let runner = PipelineRunner::new(
//!     Arc::from(factory.create_default()),
//!     Arc::new(DaedraSearchClient::new()),
//!     4,
//!     RunnerSettings::default(),
//! );
//!
//! let (events, mut progress) = mpsc::channel(32);
//! let report = runner
//!     .run(Uuid::new_v4(), "impact of microplastics on coral reefs".to_string(),
//!          RunOptions { interactive: false }, events)
//!     .await?;
//! ```
//!
//! ## Architecture
//!
//! The pipeline is a small state machine over one typed state record per
//! run: stages return partial updates, a reducer folds them in (append-only
//! for accumulated findings, overwrite for everything else), and a pure
//! transition function picks the next stage. The only loop is the research
//! cycle, bounded by the plan length; the only suspension point besides
//! collaborator I/O is the clarification handshake.
//!
//! ## Modules
//!
//! - [`pipeline`] - State record, stages, transition function, runner
//! - [`llm`] - Language-generation collaborator clients
//! - [`search`] - Web search collaborator
//! - [`api`] - REST + WebSocket presentation layer
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration

/// HTTP API handlers and routes.
pub mod api;
/// LLM provider clients and abstractions.
pub mod llm;
/// The staged research pipeline.
pub mod pipeline;
/// Web search collaborator.
pub mod search;
/// Core types (requests, responses, events, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use llm::{LLMClient, LLMClientFactory, Provider};
pub use pipeline::{PipelineRunner, RunOptions, RunnerSettings};
pub use search::{DaedraSearchClient, SearchClient};
pub use types::{AppError, PipelineEvent, Result};
pub use utils::config::Config;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// The pipeline runner serving all concurrent runs
    pub runner: Arc<PipelineRunner>,
}
