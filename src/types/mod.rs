use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResearchRequest {
    pub topic: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResearchResponse {
    pub report: String,
    pub duration_ms: u64,
}

// ============= Pipeline Output Types =============

/// Research plan produced by the supervisor stage.
///
/// `steps` and `queries` are index-aligned: `queries[i]` is the web search
/// that executes `steps[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct ResearchPlan {
    pub steps: Vec<String>,
    pub queries: Vec<String>,
}

/// One completed research iteration: the query that ran and what it found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchFinding {
    pub query: String,
    pub findings: String,
}

/// Progress message streamed to clients, one per completed pipeline stage.
///
/// Serializes as `{"type": ..., "data": ...}`. A completed run emits exactly
/// one `final_report`, always last; a failed run ends with `error` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PipelineEvent {
    ClarificationRequest(String),
    ClarifiedRequest(String),
    Brief(String),
    Plan(ResearchPlan),
    ResearchResult(ResearchFinding),
    FinalReport(String),
    Error(String),
}

// ============= Search Types =============

/// A single web search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub content: String,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A collaborator (LLM or search) was unreachable, timed out, or errored.
    #[error("Collaborator unavailable: {0}")]
    Collaborator(String),

    /// The generation collaborator returned output that cannot satisfy the
    /// required structure. Not retryable without changing prompt or schema.
    #[error("Schema validation failed: {0}")]
    SchemaValidation(String),

    /// A suspended run was never answered and has been reclaimed.
    #[error("Clarification timed out: {0}")]
    ClarificationTimeout(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let (status, message) = match self {
            AppError::Collaborator(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::SchemaValidation(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::ClarificationTimeout(msg) => (StatusCode::REQUEST_TIMEOUT, msg),
            AppError::RunNotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Configuration(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
