//! Integration tests for the research pipeline.
//!
//! These drive full runs through the runner with mocked collaborators and
//! verify the loop bound, accumulation order, schema strictness, the
//! clarification handshake, and isolation between concurrent runs.

mod common;

use atlas::pipeline::{PipelineRunner, RunOptions, RunnerSettings};
use atlas::types::{AppError, PipelineEvent};
use common::mocks::{
    MockLLMClient, MockSearchClient, brief_json, clarify_ok, clarify_question, plan_json,
};
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use uuid::Uuid;

fn test_settings() -> RunnerSettings {
    RunnerSettings {
        collaborator_timeout: Duration::from_secs(5),
        clarification_timeout: Duration::from_secs(5),
        max_retries: 2,
        retry_base_delay: Duration::from_millis(1),
    }
}

fn runner_with(llm: Arc<MockLLMClient>, search: Arc<MockSearchClient>) -> PipelineRunner {
    PipelineRunner::new(llm, search, 4, test_settings())
}

fn runner_with_settings(
    llm: Arc<MockLLMClient>,
    search: Arc<MockSearchClient>,
    settings: RunnerSettings,
) -> PipelineRunner {
    PipelineRunner::new(llm, search, 4, settings)
}

/// Run non-interactively to completion and return (events, result).
async fn run_to_completion(
    runner: &PipelineRunner,
    topic: &str,
) -> (Vec<PipelineEvent>, atlas::Result<String>) {
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let result = runner
        .run(
            Uuid::new_v4(),
            topic.to_string(),
            RunOptions { interactive: false },
            event_tx,
        )
        .await;

    let mut events = Vec::new();
    while let Ok(event) = event_rx.try_recv() {
        events.push(event);
    }
    (events, result)
}

fn count_research_events(events: &[PipelineEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::ResearchResult(_)))
        .count()
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(3)]
#[case(5)]
#[tokio::test]
async fn research_cycle_runs_exactly_plan_length_times(#[case] n: usize) {
    let steps: Vec<String> = (0..n).map(|i| format!("step {}", i)).collect();
    let queries: Vec<String> = (0..n).map(|i| format!("query {}", i)).collect();
    let steps_ref: Vec<&str> = steps.iter().map(String::as_str).collect();
    let queries_ref: Vec<&str> = queries.iter().map(String::as_str).collect();

    let llm = MockLLMClient::scripted(vec![
        clarify_ok("clarified topic"),
        brief_json("the brief"),
        plan_json(&steps_ref, &queries_ref),
        "# The Report".to_string(),
    ]);
    let search = MockSearchClient::new();
    let runner = runner_with(Arc::clone(&llm), Arc::clone(&search));

    let (events, result) = run_to_completion(&runner, "some topic").await;
    assert_eq!(result.unwrap(), "# The Report");

    // exactly one search per plan entry, in plan order
    assert_eq!(search.queries(), queries);
    assert_eq!(count_research_events(&events), n);

    // exactly one final report, always last
    assert!(
        matches!(events.last(), Some(PipelineEvent::FinalReport(r)) if !r.is_empty()),
        "last event must be a non-empty final_report"
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::FinalReport(_)))
            .count(),
        1
    );
}

#[tokio::test]
async fn findings_accumulate_in_query_order() {
    let llm = MockLLMClient::scripted(vec![
        clarify_ok("topic"),
        brief_json("brief"),
        plan_json(&["a", "b", "c"], &["query a", "query b", "query c"]),
        "report".to_string(),
    ]);
    let search = MockSearchClient::new();
    let runner = runner_with(Arc::clone(&llm), Arc::clone(&search));

    let (_, result) = run_to_completion(&runner, "topic").await;
    result.unwrap();

    // the write prompt carries every accumulated finding, in completion order
    let calls = llm.calls();
    let write_prompt = calls.last().unwrap();
    let pos_a = write_prompt.find("findings for query a").unwrap();
    let pos_b = write_prompt.find("findings for query b").unwrap();
    let pos_c = write_prompt.find("findings for query c").unwrap();
    assert!(pos_a < pos_b && pos_b < pos_c);
}

#[tokio::test]
async fn misaligned_plan_is_a_schema_error_not_a_truncation() {
    let llm = MockLLMClient::scripted(vec![
        clarify_ok("topic"),
        brief_json("brief"),
        plan_json(&["step one", "step two"], &["only query"]),
    ]);
    let search = MockSearchClient::new();
    let runner = runner_with(Arc::clone(&llm), Arc::clone(&search));

    let (_, result) = run_to_completion(&runner, "topic").await;
    assert!(matches!(result.unwrap_err(), AppError::SchemaValidation(_)));

    // schema errors are not retried: clarify, brief, one plan attempt
    assert_eq!(llm.call_count(), 3);
    assert!(search.queries().is_empty());
}

#[tokio::test]
async fn unparseable_plan_is_a_schema_error() {
    let llm = MockLLMClient::scripted(vec![
        clarify_ok("topic"),
        brief_json("brief"),
        "Step 1: just wing it".to_string(),
    ]);
    let search = MockSearchClient::new();
    let runner = runner_with(llm, search);

    let (_, result) = run_to_completion(&runner, "topic").await;
    assert!(matches!(result.unwrap_err(), AppError::SchemaValidation(_)));
}

#[tokio::test]
async fn brief_waits_for_the_clarification_answer() {
    let llm = MockLLMClient::scripted(vec![
        clarify_question("Which reef region?"),
        brief_json("brief about the Pacific"),
        plan_json(&["step"], &["query"]),
        "report".to_string(),
    ]);
    let search = MockSearchClient::new();
    let runner = Arc::new(runner_with(Arc::clone(&llm), search));

    let run_id = Uuid::new_v4();
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let task = tokio::spawn({
        let runner = Arc::clone(&runner);
        async move {
            runner
                .run(
                    run_id,
                    "microplastics".to_string(),
                    RunOptions { interactive: true },
                    event_tx,
                )
                .await
        }
    });

    let first = event_rx.recv().await.unwrap();
    assert_eq!(
        first,
        PipelineEvent::ClarificationRequest("Which reef region?".to_string())
    );

    // the run is suspended: no downstream stage has been invoked
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(llm.call_count(), 1);
    assert!(matches!(event_rx.try_recv(), Err(TryRecvError::Empty)));
    assert!(runner.registry().is_awaiting(run_id));

    runner
        .registry()
        .resume(run_id, "focus on the Pacific".to_string())
        .unwrap();

    let report = task.await.unwrap().unwrap();
    assert_eq!(report, "report");

    // the brief stage saw the clarification answer, not the raw request
    assert!(llm.calls()[1].contains("focus on the Pacific"));

    let mut events = Vec::new();
    while let Ok(event) = event_rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events.first(), Some(PipelineEvent::Brief(_))));
    assert!(matches!(events.last(), Some(PipelineEvent::FinalReport(_))));

    // handle released once the run completed
    assert!(runner.registry().is_empty());
}

#[tokio::test]
async fn non_interactive_runs_never_suspend() {
    let llm = MockLLMClient::scripted(vec![
        clarify_question("Which reef region?"),
        brief_json("brief"),
        plan_json(&["step"], &["query"]),
        "report".to_string(),
    ]);
    let search = MockSearchClient::new();
    let runner = runner_with(Arc::clone(&llm), search);

    let (events, result) = run_to_completion(&runner, "microplastics").await;
    assert_eq!(result.unwrap(), "report");

    // the question is still surfaced, but the raw request carries forward
    assert!(matches!(
        events.first(),
        Some(PipelineEvent::ClarificationRequest(_))
    ));
    assert!(llm.calls()[1].contains("microplastics"));
}

#[tokio::test]
async fn unanswered_clarifications_time_out() {
    let llm = MockLLMClient::scripted(vec![clarify_question("Which region?")]);
    let search = MockSearchClient::new();
    let runner = runner_with_settings(
        llm,
        search,
        RunnerSettings {
            clarification_timeout: Duration::from_millis(50),
            ..test_settings()
        },
    );

    let (event_tx, _event_rx) = mpsc::channel(64);
    let result = runner
        .run(
            Uuid::new_v4(),
            "topic".to_string(),
            RunOptions { interactive: true },
            event_tx,
        )
        .await;

    assert!(matches!(
        result.unwrap_err(),
        AppError::ClarificationTimeout(_)
    ));
    assert!(runner.registry().is_empty());
}

#[tokio::test]
async fn concurrent_runs_do_not_cross_contaminate() {
    let llm = MockLLMClient::with_handler(|prompt| {
        let topic = if prompt.contains("alpha") { "alpha" } else { "beta" };
        if prompt.contains("needs clarification") {
            Ok(clarify_ok(&format!("all about {}", topic)))
        } else if prompt.contains("research brief") {
            Ok(brief_json(&format!("scope: {}", topic)))
        } else if prompt.contains("research plan") {
            let step = format!("step {}", topic);
            let query = format!("query {}", topic);
            Ok(plan_json(&[step.as_str()], &[query.as_str()]))
        } else {
            Ok(format!("report on {}", topic))
        }
    });
    let search = MockSearchClient::new();
    let runner = runner_with(Arc::clone(&llm), Arc::clone(&search));

    let (a, b) = tokio::join!(
        run_to_completion(&runner, "alpha"),
        run_to_completion(&runner, "beta")
    );
    assert_eq!(a.1.unwrap(), "report on alpha");
    assert_eq!(b.1.unwrap(), "report on beta");

    // each run's write stage saw only its own findings
    let calls = llm.calls();
    let write_alpha = calls
        .iter()
        .find(|p| p.contains("comprehensive report") && p.contains("alpha"))
        .unwrap();
    assert!(write_alpha.contains("findings for query alpha"));
    assert!(!write_alpha.contains("beta"));

    let write_beta = calls
        .iter()
        .find(|p| p.contains("comprehensive report") && p.contains("beta"))
        .unwrap();
    assert!(write_beta.contains("findings for query beta"));
    assert!(!write_beta.contains("alpha"));

    let queries = search.queries();
    assert!(queries.contains(&"query alpha".to_string()));
    assert!(queries.contains(&"query beta".to_string()));
}

#[tokio::test]
async fn end_to_end_two_iteration_run() {
    let llm = MockLLMClient::scripted(vec![
        clarify_ok("impact of microplastics on coral reefs"),
        brief_json("brief: microplastics and reefs"),
        plan_json(
            &["find recent studies", "find policy response"],
            &[
                "microplastics coral reef damage 2024",
                "coral reef microplastics policy",
            ],
        ),
        "# Microplastics and Coral Reefs".to_string(),
    ]);
    let search = MockSearchClient::new();
    let runner = runner_with(Arc::clone(&llm), Arc::clone(&search));

    let (events, result) =
        run_to_completion(&runner, "impact of microplastics on coral reefs").await;
    result.unwrap();

    assert_eq!(
        search.queries(),
        vec![
            "microplastics coral reef damage 2024",
            "coral reef microplastics policy",
        ]
    );
    assert_eq!(count_research_events(&events), 2);

    // both findings made it into the synthesis
    let calls = llm.calls();
    let write_prompt = calls.last().unwrap();
    assert!(write_prompt.contains("findings for microplastics coral reef damage 2024"));
    assert!(write_prompt.contains("findings for coral reef microplastics policy"));

    assert!(
        matches!(events.last(), Some(PipelineEvent::FinalReport(r)) if !r.is_empty()),
        "run must end with a non-empty final_report"
    );
}

#[tokio::test]
async fn llm_outage_fails_the_run() {
    let llm = MockLLMClient::failing();
    let search = MockSearchClient::new();
    let runner = runner_with(Arc::clone(&llm), search);

    let (events, result) = run_to_completion(&runner, "topic").await;
    assert!(matches!(result.unwrap_err(), AppError::Collaborator(_)));
    assert!(events.is_empty());

    // transient failures get max_retries extra attempts before giving up
    assert_eq!(llm.call_count(), 1 + test_settings().max_retries as usize);
}

#[tokio::test]
async fn search_outage_fails_the_run() {
    let llm = MockLLMClient::scripted(vec![
        clarify_ok("topic"),
        brief_json("brief"),
        plan_json(&["step"], &["query"]),
        "report".to_string(),
    ]);
    let search = MockSearchClient::failing();
    let runner = runner_with(llm, search);

    let (_, result) = run_to_completion(&runner, "topic").await;
    assert!(matches!(result.unwrap_err(), AppError::Collaborator(_)));
}

#[tokio::test]
async fn transient_llm_failures_are_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let llm = MockLLMClient::with_handler({
        let attempts = Arc::clone(&attempts);
        move |prompt| {
            if prompt.contains("needs clarification") {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(AppError::Collaborator("flaky".to_string()));
                }
                Ok(clarify_ok("topic"))
            } else if prompt.contains("research brief") {
                Ok(brief_json("brief"))
            } else if prompt.contains("research plan") {
                Ok(plan_json(&[], &[]))
            } else {
                Ok("report".to_string())
            }
        }
    });
    let search = MockSearchClient::new();
    let runner = runner_with(llm, search);

    let (_, result) = run_to_completion(&runner, "topic").await;
    assert_eq!(result.unwrap(), "report");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_plan_writes_immediately() {
    let llm = MockLLMClient::scripted(vec![
        clarify_ok("topic"),
        brief_json("brief"),
        plan_json(&[], &[]),
        "report with no research".to_string(),
    ]);
    let search = MockSearchClient::new();
    let runner = runner_with(Arc::clone(&llm), Arc::clone(&search));

    let (events, result) = run_to_completion(&runner, "topic").await;
    assert_eq!(result.unwrap(), "report with no research");

    assert!(search.queries().is_empty());
    assert_eq!(count_research_events(&events), 0);
    assert!(matches!(events.last(), Some(PipelineEvent::FinalReport(_))));
}
