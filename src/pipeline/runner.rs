//! The pipeline runner: drives the stage machine to completion, folds each
//! stage's output into the run state, emits progress events, and manages the
//! clarification suspend/resume handshake.

use crate::llm::LLMClient;
use crate::pipeline::stages::{
    BriefStage, ClarifyStage, ExecuteTaskStage, IncrementIndexStage, PlanStage, ResearchStage,
    Stage, WriteStage,
};
use crate::pipeline::state::{RunState, StateUpdate};
use crate::pipeline::transition::{StageId, next_stage};
use crate::search::SearchClient;
use crate::types::{AppError, PipelineEvent, ResearchFinding, ResearchPlan, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Tunables for stage execution and suspension.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Deadline for a single collaborator-backed stage attempt.
    pub collaborator_timeout: Duration,
    /// How long a suspended run waits for a clarification answer.
    pub clarification_timeout: Duration,
    /// Retries after a transient stage failure. Schema errors never retry.
    pub max_retries: u32,
    /// First retry delay; doubles per attempt.
    pub retry_base_delay: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            collaborator_timeout: Duration::from_secs(120),
            clarification_timeout: Duration::from_secs(300),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// Per-run execution options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Interactive runs suspend on a clarification request and wait for the
    /// client's answer. Non-interactive runs (the request/response entry
    /// point) carry the raw request forward instead of suspending.
    pub interactive: bool,
}

/// The full stage set for one pipeline shape, with collaborators injected at
/// construction time.
pub struct Pipeline {
    clarify: ClarifyStage,
    brief: BriefStage,
    plan: PlanStage,
    research: ResearchStage,
    execute_task: ExecuteTaskStage,
    increment_index: IncrementIndexStage,
    write: WriteStage,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        search: Arc<dyn SearchClient>,
        max_search_results: usize,
    ) -> Self {
        Self {
            clarify: ClarifyStage::new(Arc::clone(&llm)),
            brief: BriefStage::new(Arc::clone(&llm)),
            plan: PlanStage::new(Arc::clone(&llm)),
            research: ResearchStage::new(search, max_search_results),
            execute_task: ExecuteTaskStage,
            increment_index: IncrementIndexStage,
            write: WriteStage::new(llm),
        }
    }

    fn stage(&self, id: StageId) -> Option<&dyn Stage> {
        match id {
            StageId::Clarify => Some(&self.clarify),
            StageId::Brief => Some(&self.brief),
            StageId::Plan => Some(&self.plan),
            StageId::Research => Some(&self.research),
            StageId::ExecuteTask => Some(&self.execute_task),
            StageId::IncrementIndex => Some(&self.increment_index),
            StageId::Write => Some(&self.write),
            StageId::Done => None,
        }
    }
}

struct RunHandle {
    clarification_tx: mpsc::Sender<String>,
    awaiting_clarification: bool,
    started_at: DateTime<Utc>,
}

/// Live run handles, keyed by run ID. One entry per in-flight run; entries
/// are released when the run completes, fails, or is aborted.
pub struct RunRegistry {
    runs: Mutex<HashMap<Uuid, RunHandle>>,
}

impl RunRegistry {
    fn new() -> Self {
        Self {
            runs: Mutex::new(HashMap::new()),
        }
    }

    fn register(&self, run_id: Uuid) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(4);
        self.runs.lock().insert(
            run_id,
            RunHandle {
                clarification_tx: tx,
                awaiting_clarification: false,
                started_at: Utc::now(),
            },
        );
        rx
    }

    fn remove(&self, run_id: Uuid) {
        if let Some(handle) = self.runs.lock().remove(&run_id) {
            let elapsed = Utc::now().signed_duration_since(handle.started_at);
            tracing::debug!(%run_id, elapsed_ms = elapsed.num_milliseconds(), "run released");
        }
    }

    fn set_awaiting(&self, run_id: Uuid, awaiting: bool) {
        if let Some(handle) = self.runs.lock().get_mut(&run_id) {
            handle.awaiting_clarification = awaiting;
        }
    }

    /// Whether the run is currently suspended on a clarification request.
    pub fn is_awaiting(&self, run_id: Uuid) -> bool {
        self.runs
            .lock()
            .get(&run_id)
            .map(|handle| handle.awaiting_clarification)
            .unwrap_or(false)
    }

    /// Resume a suspended run with the client's clarification answer.
    ///
    /// Answers are only valid while the run awaits one; anything else is
    /// rejected rather than queued.
    pub fn resume(&self, run_id: Uuid, answer: String) -> Result<()> {
        let runs = self.runs.lock();
        let handle = runs
            .get(&run_id)
            .ok_or_else(|| AppError::RunNotFound(run_id.to_string()))?;

        if !handle.awaiting_clarification {
            return Err(AppError::InvalidInput(
                "run is not awaiting clarification".to_string(),
            ));
        }

        handle
            .clarification_tx
            .try_send(answer)
            .map_err(|_| AppError::Internal("clarification channel unavailable".to_string()))
    }

    /// Number of in-flight runs.
    pub fn len(&self) -> usize {
        self.runs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.lock().is_empty()
    }
}

/// Releases the registry entry even when the run future is dropped mid-way
/// (client disconnect aborts the task).
struct RegistryGuard<'a> {
    registry: &'a RunRegistry,
    run_id: Uuid,
}

impl Drop for RegistryGuard<'_> {
    fn drop(&mut self) {
        self.registry.remove(self.run_id);
    }
}

/// Drives pipeline runs. One runner serves many concurrent runs; each run
/// gets its own isolated state record and event stream.
pub struct PipelineRunner {
    pipeline: Pipeline,
    settings: RunnerSettings,
    runs: RunRegistry,
}

impl PipelineRunner {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        search: Arc<dyn SearchClient>,
        max_search_results: usize,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            pipeline: Pipeline::new(llm, search, max_search_results),
            settings,
            runs: RunRegistry::new(),
        }
    }

    /// Handles for suspend/resume and run introspection.
    pub fn registry(&self) -> &RunRegistry {
        &self.runs
    }

    /// Execute one run to completion and return the final report.
    ///
    /// Emits one event per completed collaborator stage on `events`. If the
    /// event receiver is dropped the run is abandoned at its next emission
    /// point and no report is produced.
    pub async fn run(
        &self,
        run_id: Uuid,
        request: String,
        options: RunOptions,
        events: mpsc::Sender<PipelineEvent>,
    ) -> Result<String> {
        let mut clarification_rx = self.runs.register(run_id);
        let _guard = RegistryGuard {
            registry: &self.runs,
            run_id,
        };

        self.drive(run_id, request, options, &events, &mut clarification_rx)
            .await
    }

    async fn drive(
        &self,
        run_id: Uuid,
        request: String,
        options: RunOptions,
        events: &mpsc::Sender<PipelineEvent>,
        clarification_rx: &mut mpsc::Receiver<String>,
    ) -> Result<String> {
        let mut state = RunState::new(request);
        let mut current = StageId::Clarify;

        tracing::info!(%run_id, request = %state.request, "pipeline run started");

        while current != StageId::Done {
            let stage = self
                .pipeline
                .stage(current)
                .ok_or_else(|| AppError::Internal(format!("no stage for {}", current.as_str())))?;

            let update = self.run_stage(run_id, stage, &state).await?;
            state.apply(update);

            match current {
                StageId::Clarify if state.clarification_needed => {
                    self.send(
                        events,
                        PipelineEvent::ClarificationRequest(state.clarification_question.clone()),
                    )
                    .await?;

                    let answer = if options.interactive {
                        self.await_clarification(run_id, clarification_rx).await?
                    } else {
                        // Nobody to ask on the request/response path.
                        state.request.clone()
                    };

                    state.apply(StateUpdate {
                        clarification_needed: Some(false),
                        clarification_question: Some(String::new()),
                        clarified_request: Some(answer),
                        ..Default::default()
                    });
                }
                StageId::Clarify => {
                    self.send(
                        events,
                        PipelineEvent::ClarifiedRequest(state.clarified_request.clone()),
                    )
                    .await?;
                }
                StageId::Brief => {
                    self.send(events, PipelineEvent::Brief(state.brief.clone()))
                        .await?;
                }
                StageId::Plan => {
                    self.send(
                        events,
                        PipelineEvent::Plan(ResearchPlan {
                            steps: state.plan.clone(),
                            queries: state.queries.clone(),
                        }),
                    )
                    .await?;
                }
                StageId::Research => {
                    let query = state
                        .queries
                        .get(state.current_index)
                        .cloned()
                        .unwrap_or_default();
                    self.send(
                        events,
                        PipelineEvent::ResearchResult(ResearchFinding {
                            query,
                            findings: state.last_result.clone(),
                        }),
                    )
                    .await?;
                }
                StageId::Write => {
                    self.send(events, PipelineEvent::FinalReport(state.report.clone()))
                        .await?;
                }
                StageId::ExecuteTask | StageId::IncrementIndex | StageId::Done => {}
            }

            current = next_stage(current, &state);
        }

        tracing::info!(%run_id, findings = state.accumulated_results.len(), "pipeline run complete");

        Ok(state.report)
    }

    /// Run one stage with a deadline and bounded retry.
    async fn run_stage(
        &self,
        run_id: Uuid,
        stage: &dyn Stage,
        state: &RunState,
    ) -> Result<StateUpdate> {
        let mut attempt = 0u32;

        loop {
            let started = Instant::now();
            let outcome =
                tokio::time::timeout(self.settings.collaborator_timeout, stage.run(state)).await;

            match outcome {
                Ok(Ok(update)) => {
                    tracing::debug!(
                        %run_id,
                        stage = stage.id().as_str(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "stage complete"
                    );
                    return Ok(update);
                }
                // Retrying cannot fix a shape mismatch.
                Ok(Err(err @ AppError::SchemaValidation(_))) => return Err(err),
                Ok(Err(err)) => {
                    if attempt >= self.settings.max_retries {
                        return Err(err);
                    }
                    tracing::warn!(
                        %run_id,
                        stage = stage.id().as_str(),
                        attempt,
                        "stage failed, retrying: {err}"
                    );
                }
                Err(_) => {
                    if attempt >= self.settings.max_retries {
                        return Err(AppError::Collaborator(format!(
                            "{} stage timed out after {:?}",
                            stage.id().as_str(),
                            self.settings.collaborator_timeout
                        )));
                    }
                    tracing::warn!(
                        %run_id,
                        stage = stage.id().as_str(),
                        attempt,
                        "stage timed out, retrying"
                    );
                }
            }

            attempt += 1;
            let delay = self.settings.retry_base_delay * 2u32.saturating_pow(attempt - 1);
            tokio::time::sleep(delay).await;
        }
    }

    async fn await_clarification(
        &self,
        run_id: Uuid,
        clarification_rx: &mut mpsc::Receiver<String>,
    ) -> Result<String> {
        tracing::info!(%run_id, "run suspended awaiting clarification");
        self.runs.set_awaiting(run_id, true);

        let outcome =
            tokio::time::timeout(self.settings.clarification_timeout, clarification_rx.recv())
                .await;

        self.runs.set_awaiting(run_id, false);

        match outcome {
            Ok(Some(answer)) => {
                tracing::info!(%run_id, "clarification received, resuming");
                Ok(answer)
            }
            Ok(None) => Err(AppError::Internal(
                "clarification channel closed".to_string(),
            )),
            Err(_) => Err(AppError::ClarificationTimeout(format!(
                "no answer within {:?}",
                self.settings.clarification_timeout
            ))),
        }
    }

    async fn send(&self, events: &mpsc::Sender<PipelineEvent>, event: PipelineEvent) -> Result<()> {
        events
            .send(event)
            .await
            .map_err(|_| AppError::Internal("event receiver dropped; run abandoned".to_string()))
    }
}
