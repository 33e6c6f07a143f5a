//! The state record threaded through every pipeline stage, and the reducer
//! that folds partial stage outputs into it.

/// Shared memory for one pipeline run.
///
/// Owned exclusively by the runner for the run's lifetime. `request` is
/// immutable once set; every other field is written by exactly one stage
/// (plus the clarification handoff for `clarified_request`).
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// The raw research request as submitted by the client.
    pub request: String,
    pub clarification_needed: bool,
    /// Non-empty iff `clarification_needed`.
    pub clarification_question: String,
    /// Used downstream in place of `request` once set.
    pub clarified_request: String,
    pub brief: String,
    /// Ordered research steps; defines the iteration bound.
    pub plan: Vec<String>,
    /// Search queries, index-aligned with `plan`.
    pub queries: Vec<String>,
    /// Research cursor: 0 <= current_index <= plan.len(), monotonic.
    pub current_index: usize,
    /// Output of the most recent research iteration, overwritten each time.
    pub last_result: String,
    /// Append-only findings, in completion order.
    pub accumulated_results: Vec<String>,
    /// Set exactly once, by the terminal write stage.
    pub report: String,
}

impl RunState {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            ..Default::default()
        }
    }

    /// Best available phrasing of what the user wants.
    pub fn effective_request(&self) -> &str {
        if self.clarified_request.is_empty() {
            &self.request
        } else {
            &self.clarified_request
        }
    }

    /// Input for the planning stage: brief, else clarified request, else raw.
    pub fn research_input(&self) -> &str {
        if self.brief.is_empty() {
            self.effective_request()
        } else {
            &self.brief
        }
    }

    /// Fold a stage's partial update into the running state.
    ///
    /// Overwrite-on-write for every field except `accumulated_results`,
    /// which appends in arrival order and never deduplicates.
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(v) = update.clarification_needed {
            self.clarification_needed = v;
        }
        if let Some(v) = update.clarification_question {
            self.clarification_question = v;
        }
        if let Some(v) = update.clarified_request {
            self.clarified_request = v;
        }
        if let Some(v) = update.brief {
            self.brief = v;
        }
        if let Some(v) = update.plan {
            self.plan = v;
        }
        if let Some(v) = update.queries {
            self.queries = v;
        }
        if let Some(v) = update.current_index {
            self.current_index = v;
        }
        if let Some(v) = update.last_result {
            self.last_result = v;
        }
        if let Some(v) = update.report {
            self.report = v;
        }
        self.accumulated_results.extend(update.appended_results);
    }
}

/// Partial state update returned by a stage.
///
/// `None` fields are left untouched by the reducer; `appended_results`
/// entries are concatenated onto `accumulated_results`.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub clarification_needed: Option<bool>,
    pub clarification_question: Option<String>,
    pub clarified_request: Option<String>,
    pub brief: Option<String>,
    pub plan: Option<Vec<String>>,
    pub queries: Option<Vec<String>>,
    pub current_index: Option<usize>,
    pub last_result: Option<String>,
    pub appended_results: Vec<String>,
    pub report: Option<String>,
}
