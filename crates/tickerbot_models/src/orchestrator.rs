//! Deadline-bounded generation across rotating model candidates.

use crate::extract_text;
use chrono::Utc;
use std::sync::Arc;
use tickerbot_core::{
    AttemptOutcome, GenerationAttempt, GenerationCall, GenerationOutcome, GenerationReport,
    GenerationRequest,
};
use tickerbot_error::{GeminiError, GeminiErrorKind, RetryableError};
use tickerbot_interface::TextGenerator;
use tickerbot_rate_limit::BackoffPolicy;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Drives generation attempts until one yields text or the deadline passes.
///
/// Attempt `i` (zero-based) uses `model_candidates[i % len]`. Each call is
/// bounded by the request's per-call timeout, and the wait between attempts
/// follows the [`BackoffPolicy`], clamped to the time left. The run therefore
/// never outlasts the hard deadline by more than one call timeout.
///
/// Failures never escape: when the deadline passes the run resolves to
/// [`tickerbot_core::GENERATION_FALLBACK_TEXT`].
#[derive(Clone)]
pub struct RetryOrchestrator {
    generator: Arc<dyn TextGenerator>,
    backoff: BackoffPolicy,
}

impl std::fmt::Debug for RetryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryOrchestrator")
            .field("provider", &self.generator.provider_name())
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl RetryOrchestrator {
    /// Creates an orchestrator over a generation backend.
    pub fn new(generator: Arc<dyn TextGenerator>, backoff: BackoffPolicy) -> Self {
        Self { generator, backoff }
    }

    /// Backoff policy between attempts.
    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Generate text, falling back to the fixed message on deadline.
    pub async fn generate(&self, request: &GenerationRequest) -> String {
        self.generate_report(request).await.into_text()
    }

    /// Generate text and return the full attempt log alongside it.
    #[instrument(
        skip(self, request),
        fields(
            provider = self.generator.provider_name(),
            models = request.model_candidates().len(),
            deadline_secs = request.hard_deadline().as_secs(),
        )
    )]
    pub async fn generate_report(&self, request: &GenerationRequest) -> GenerationReport {
        let deadline = Instant::now() + *request.hard_deadline();
        let mut attempts: Vec<GenerationAttempt> = Vec::new();
        let mut index: usize = 0;

        while Instant::now() < deadline {
            let model = request.model_for_attempt(index);
            let sequence = u32::try_from(index + 1).unwrap_or(u32::MAX);
            let started_at = Utc::now();

            debug!(attempt = sequence, model, "Starting generation attempt");
            let outcome = self.attempt(&request.call_for(model)).await;

            let text = match &outcome {
                AttemptOutcome::Success(text) => Some(text.clone()),
                _ => None,
            };
            attempts.push(GenerationAttempt::new(sequence, model, started_at, outcome));

            if let Some(text) = text {
                info!(
                    attempt = sequence,
                    model,
                    chars = text.chars().count(),
                    "Generation succeeded"
                );
                return GenerationReport::new(
                    GenerationOutcome::Generated {
                        text,
                        model: model.to_string(),
                    },
                    attempts,
                );
            }

            index += 1;

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let delay = self
                .backoff
                .delay(sequence, &mut rand::thread_rng())
                .min(remaining);
            debug!(
                attempt = sequence,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Backing off before next attempt"
            );
            tokio::time::sleep(delay).await;
        }

        error!(
            attempts = attempts.len(),
            "Generation deadline exceeded, using fallback text"
        );
        GenerationReport::new(GenerationOutcome::DeadlineExceeded, attempts)
    }

    /// One bounded call, classified.
    async fn attempt(&self, call: &GenerationCall) -> AttemptOutcome {
        let result = tokio::time::timeout(*call.timeout(), self.generator.generate_content(call)).await;

        match result {
            Ok(Ok(envelope)) => match extract_text(&envelope) {
                Some(text) => AttemptOutcome::Success(text),
                None => {
                    warn!(
                        model = %call.model(),
                        block_reason = ?envelope.block_reason(),
                        finish_reasons = ?envelope.finish_reasons(),
                        "Reply carried no text"
                    );
                    AttemptOutcome::EmptyContent
                }
            },
            Ok(Err(e)) => {
                if e.is_retryable() {
                    warn!(model = %call.model(), error = %e, "Transient generation error");
                } else {
                    error!(model = %call.model(), error = %e, "Generation error, retrying anyway");
                }
                AttemptOutcome::TransientError(e.kind.to_string())
            }
            Err(_) => {
                let e = GeminiError::new(GeminiErrorKind::Timeout {
                    after_ms: u64::try_from(call.timeout().as_millis()).unwrap_or(u64::MAX),
                });
                warn!(model = %call.model(), error = %e, "Generation call timed out");
                AttemptOutcome::TransientError(e.kind.to_string())
            }
        }
    }
}
