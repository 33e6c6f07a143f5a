use crate::{
    AppState,
    pipeline::RunOptions,
    types::{AppError, ResearchRequest, ResearchResponse, Result},
};
use axum::{Json, extract::State};
use std::time::Instant;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Run the research pipeline to completion for a topic
#[utoipa::path(
    post,
    path = "/api/research",
    request_body = ResearchRequest,
    responses(
        (status = 200, description = "Research completed", body = ResearchResponse),
        (status = 400, description = "Invalid input"),
        (status = 502, description = "A collaborator failed")
    ),
    tag = "research"
)]
pub async fn research(
    State(state): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>> {
    if payload.topic.trim().is_empty() {
        return Err(AppError::InvalidInput("topic must not be empty".to_string()));
    }

    let start = Instant::now();
    let run_id = Uuid::new_v4();

    // Nothing streams on this path; drain events so the run never blocks on
    // a full channel. The drain task ends when the run drops its sender.
    let (event_tx, mut event_rx) = mpsc::channel(32);
    tokio::spawn(async move { while event_rx.recv().await.is_some() {} });

    let report = state
        .runner
        .run(
            run_id,
            payload.topic,
            RunOptions { interactive: false },
            event_tx,
        )
        .await?;

    Ok(Json(ResearchResponse {
        report,
        duration_ms: start.elapsed().as_millis() as u64,
    }))
}
