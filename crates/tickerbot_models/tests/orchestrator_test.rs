//! Retry orchestration tests on a paused clock.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tickerbot_core::{
    AttemptOutcome, GENERATION_FALLBACK_TEXT, GenerationCall, GenerationOutcome,
    GenerationRequest, ResponseEnvelope,
};
use tickerbot_error::{GeminiError, GeminiErrorKind};
use tickerbot_interface::TextGenerator;
use tickerbot_models::RetryOrchestrator;
use tickerbot_rate_limit::BackoffPolicy;
use tokio::time::Instant;

#[derive(Clone)]
enum Behavior {
    Fail,
    Empty,
    Reply(&'static str),
    Hang,
}

/// Generator that plays back a per-model script, repeating the last step.
struct ScriptedGenerator {
    scripts: HashMap<&'static str, Vec<Behavior>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(scripts: Vec<(&'static str, Vec<Behavior>)>) -> Self {
        Self {
            scripts: scripts.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_content(
        &self,
        call: &GenerationCall,
    ) -> Result<ResponseEnvelope, GeminiError> {
        let step = {
            let mut calls = self.calls.lock().expect("calls lock");
            let seen = calls.iter().filter(|m| *m == call.model()).count();
            calls.push(call.model().clone());
            let script = &self.scripts[call.model().as_str()];
            script[seen.min(script.len() - 1)].clone()
        };

        match step {
            Behavior::Fail => Err(GeminiError::new(GeminiErrorKind::HttpError {
                status_code: 503,
                message: "overloaded".to_string(),
            })),
            Behavior::Empty => Ok(ResponseEnvelope::default()),
            Behavior::Reply(text) => Ok(ResponseEnvelope::from_texts([text])),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ResponseEnvelope::from_texts(["too late"]))
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

fn request(models: &[&str], per_call_secs: u64, deadline_secs: u64) -> GenerationRequest {
    GenerationRequest::builder()
        .prompt("Summarise the market")
        .model_candidates(models.iter().map(|m| m.to_string()).collect::<Vec<_>>())
        .per_call_timeout(Duration::from_secs(per_call_secs))
        .hard_deadline(Duration::from_secs(deadline_secs))
        .build()
        .expect("valid request")
}

#[tokio::test(start_paused = true)]
async fn test_alternating_failures_then_success() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        ("model-a", vec![Behavior::Fail]),
        ("model-b", vec![Behavior::Fail, Behavior::Reply("OK")]),
    ]));
    let orchestrator = RetryOrchestrator::new(
        generator.clone(),
        BackoffPolicy::with_max_backoff(Duration::from_secs(64)),
    );

    let report = orchestrator
        .generate_report(&request(&["model-a", "model-b"], 30, 300))
        .await;

    assert_eq!(report.text(), "OK");
    assert_eq!(report.attempts().len(), 4);
    assert_eq!(
        generator.calls(),
        vec!["model-a", "model-b", "model-a", "model-b"]
    );
    assert_eq!(
        report.outcome(),
        &GenerationOutcome::Generated {
            text: "OK".to_string(),
            model: "model-b".to_string(),
        }
    );
    let sequences: Vec<u32> = report
        .attempts()
        .iter()
        .map(|a| *a.sequence_number())
        .collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);
    assert!(matches!(
        report.attempts()[0].outcome(),
        AttemptOutcome::TransientError(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_failing_and_succeeding_candidate_finishes_before_deadline() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        ("broken", vec![Behavior::Fail]),
        ("healthy", vec![Behavior::Reply("Markets were calm.")]),
    ]));
    let orchestrator = RetryOrchestrator::new(generator, BackoffPolicy::default());
    let start = Instant::now();

    let text = orchestrator
        .generate(&request(&["broken", "healthy"], 10, 120))
        .await;

    assert_eq!(text, "Markets were calm.");
    assert!(start.elapsed() < Duration::from_secs(120));
}

#[tokio::test(start_paused = true)]
async fn test_all_failing_returns_fallback_after_deadline() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        ("model-a", vec![Behavior::Fail]),
        ("model-b", vec![Behavior::Empty]),
    ]));
    let orchestrator = RetryOrchestrator::new(
        generator.clone(),
        BackoffPolicy::with_max_backoff(Duration::from_secs(8)),
    );
    let start = Instant::now();

    let report = orchestrator
        .generate_report(&request(&["model-a", "model-b"], 5, 60))
        .await;
    let elapsed = start.elapsed();

    assert!(report.is_fallback());
    assert_eq!(report.text(), GENERATION_FALLBACK_TEXT);
    assert!(elapsed >= Duration::from_secs(60), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(65), "elapsed {elapsed:?}");
    assert!(report.attempts().len() >= 2);
    assert!(
        report
            .attempts()
            .iter()
            .any(|a| *a.outcome() == AttemptOutcome::EmptyContent)
    );
}

#[tokio::test(start_paused = true)]
async fn test_hanging_calls_never_overrun_deadline_by_more_than_one_timeout() {
    let generator = Arc::new(ScriptedGenerator::new(vec![("stuck", vec![Behavior::Hang])]));
    let orchestrator = RetryOrchestrator::new(generator, BackoffPolicy::default());
    let start = Instant::now();

    let report = orchestrator
        .generate_report(&request(&["stuck"], 20, 50))
        .await;
    let elapsed = start.elapsed();

    assert!(report.is_fallback());
    assert!(elapsed >= Duration::from_secs(50), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(70), "elapsed {elapsed:?}");
    for attempt in report.attempts() {
        match attempt.outcome() {
            AttemptOutcome::TransientError(cause) => assert!(cause.contains("timed out")),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_on_first_model_rotates_to_second() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        ("slow", vec![Behavior::Hang]),
        ("fast", vec![Behavior::Reply("done")]),
    ]));
    let orchestrator = RetryOrchestrator::new(generator.clone(), BackoffPolicy::default());

    let report = orchestrator
        .generate_report(&request(&["slow", "fast"], 15, 200))
        .await;

    assert_eq!(report.text(), "done");
    assert_eq!(generator.calls(), vec!["slow", "fast"]);
}

#[tokio::test(start_paused = true)]
async fn test_single_reply_returned_verbatim() {
    let generator = Arc::new(ScriptedGenerator::new(vec![(
        "model-a",
        vec![Behavior::Reply("  *Bold* report\nline two  ")],
    )]));
    let orchestrator = RetryOrchestrator::new(generator, BackoffPolicy::default());

    let text = orchestrator.generate(&request(&["model-a"], 5, 30)).await;

    assert_eq!(text, "  *Bold* report\nline two  ");
}
