//! Mock collaborators for pipeline tests.
//!
//! These doubles stand in for the language-generation and search services so
//! the pipeline can be exercised without network access. The LLM mock can be
//! scripted with a fixed response sequence or driven by a handler closure
//! that inspects the prompt; both record every prompt they receive.

use async_trait::async_trait;
use atlas::llm::LLMClient;
use atlas::search::SearchClient;
use atlas::types::{AppError, Result, SearchHit};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

type Handler = dyn Fn(&str) -> Result<String> + Send + Sync;

/// Scriptable language collaborator.
pub struct MockLLMClient {
    responses: Mutex<VecDeque<String>>,
    handler: Option<Box<Handler>>,
    should_fail: bool,
    calls: Mutex<Vec<String>>,
}

impl MockLLMClient {
    /// Serve the given responses in order; the last one repeats if the
    /// script runs short.
    pub fn scripted(responses: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            handler: None,
            should_fail: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Derive each response from the prompt.
    pub fn with_handler(
        handler: impl Fn(&str) -> Result<String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            handler: Some(Box::new(handler)),
            should_fail: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Always return a collaborator error.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            handler: None,
            should_fail: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Prompts received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn next_response(&self, prompt: &str) -> Result<String> {
        self.calls.lock().push(prompt.to_string());

        if self.should_fail {
            return Err(AppError::Collaborator("mock llm offline".to_string()));
        }
        if let Some(handler) = &self.handler {
            return handler(prompt);
        }

        let mut responses = self.responses.lock();
        match responses.len() {
            0 => Err(AppError::Collaborator(
                "mock llm script exhausted".to_string(),
            )),
            1 => Ok(responses.front().cloned().unwrap()),
            _ => Ok(responses.pop_front().unwrap()),
        }
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.next_response(prompt)
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.next_response(prompt)
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }
}

/// Search collaborator that echoes the query back as a single hit.
pub struct MockSearchClient {
    queries: Mutex<Vec<String>>,
    should_fail: bool,
}

impl MockSearchClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queries: Mutex::new(Vec::new()),
            should_fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            queries: Mutex::new(Vec::new()),
            should_fail: true,
        })
    }

    /// Queries received so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<SearchHit>> {
        self.queries.lock().push(query.to_string());

        if self.should_fail {
            return Err(AppError::Collaborator("mock search offline".to_string()));
        }

        Ok(vec![SearchHit {
            url: format!("https://example.com/{}", query.replace(' ', "-")),
            title: query.to_string(),
            content: format!("findings for {}", query),
        }])
    }
}

// ---- canned collaborator responses ----

pub fn clarify_ok(clarified: &str) -> String {
    serde_json::json!({
        "clarification_needed": false,
        "clarified_request": clarified,
    })
    .to_string()
}

pub fn clarify_question(question: &str) -> String {
    serde_json::json!({
        "clarification_needed": true,
        "clarification_question": question,
    })
    .to_string()
}

pub fn brief_json(brief: &str) -> String {
    serde_json::json!({ "brief": brief }).to_string()
}

pub fn plan_json(steps: &[&str], queries: &[&str]) -> String {
    serde_json::json!({ "steps": steps, "queries": queries }).to_string()
}
