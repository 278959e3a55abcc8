//! Generation request, attempt and outcome types.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Text returned when every attempt failed before the hard deadline.
pub const GENERATION_FALLBACK_TEXT: &str =
    "⚠️ Report generation failed: no model produced a response before the retry deadline.";

/// One report generation, tried across several model candidates.
///
/// Invariants (checked by the builder): `model_candidates` is non-empty and
/// `hard_deadline >= per_call_timeout`. Deserialization goes through the
/// builder, so it enforces them too.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tickerbot_core::GenerationRequest;
///
/// let request = GenerationRequest::builder()
///     .prompt("Summarise today's market")
///     .model_candidates(vec!["gemini-2.5-pro".to_string(), "gemini-2.5-flash".to_string()])
///     .per_call_timeout(Duration::from_secs(30))
///     .hard_deadline(Duration::from_secs(120))
///     .build()
///     .unwrap();
///
/// assert_eq!(request.model_for_attempt(0), "gemini-2.5-pro");
/// assert_eq!(request.model_for_attempt(3), "gemini-2.5-flash");
///
/// let invalid = GenerationRequest::builder()
///     .prompt("x")
///     .model_candidates(Vec::<String>::new())
///     .build();
/// assert!(invalid.is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_builder::Builder)]
#[serde(try_from = "GenerationRequestBuilder")]
#[builder(setter(into), derive(Deserialize), build_fn(validate = "Self::validate"))]
pub struct GenerationRequest {
    /// Rendered prompt text
    prompt: String,
    /// Model identifiers, tried round-robin
    model_candidates: Vec<String>,
    /// Sampling temperature
    #[builder(default = "0.7")]
    temperature: f32,
    /// Maximum tokens the model may produce
    #[builder(default = "8192")]
    max_output_tokens: u32,
    /// Bound on a single generation call
    #[builder(default = "Duration::from_secs(60)")]
    per_call_timeout: Duration,
    /// Bound on the whole generation, across all attempts
    #[builder(default = "Duration::from_secs(300)")]
    hard_deadline: Duration,
}

impl GenerationRequestBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(models) = &self.model_candidates {
            if models.is_empty() {
                return Err("model_candidates must not be empty".to_string());
            }
            if models.iter().any(|m| m.trim().is_empty()) {
                return Err("model identifiers must not be blank".to_string());
            }
        }
        let per_call = self.per_call_timeout.unwrap_or(Duration::from_secs(60));
        let deadline = self.hard_deadline.unwrap_or(Duration::from_secs(300));
        if deadline < per_call {
            return Err(format!(
                "hard_deadline ({:?}) must be at least per_call_timeout ({:?})",
                deadline, per_call
            ));
        }
        Ok(())
    }
}

impl TryFrom<GenerationRequestBuilder> for GenerationRequest {
    type Error = GenerationRequestBuilderError;

    fn try_from(builder: GenerationRequestBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

impl GenerationRequest {
    /// Returns a builder for constructing a GenerationRequest.
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }

    /// Model used for the zero-based attempt `index`.
    pub fn model_for_attempt(&self, index: usize) -> &str {
        &self.model_candidates[index % self.model_candidates.len()]
    }

    /// Builds the single-call request for one model.
    pub fn call_for(&self, model: &str) -> GenerationCall {
        GenerationCall {
            model: model.to_string(),
            prompt: self.prompt.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            timeout: self.per_call_timeout,
        }
    }
}

/// Everything the backend needs for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct GenerationCall {
    /// Model identifier
    model: String,
    /// Prompt text
    prompt: String,
    /// Sampling temperature
    temperature: f32,
    /// Maximum output tokens
    max_output_tokens: u32,
    /// Per-call timeout
    timeout: Duration,
}

/// Result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum AttemptOutcome {
    /// Backend produced usable text.
    Success(String),
    /// Backend answered but no text could be extracted.
    EmptyContent,
    /// Transport error or timeout.
    TransientError(String),
}

impl AttemptOutcome {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        self.into()
    }
}

/// Diagnostic record of a single attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct GenerationAttempt {
    /// One-based attempt number
    sequence_number: u32,
    /// Model identifier used
    model_used: String,
    /// Wall-clock start of the attempt
    started_at: DateTime<Utc>,
    /// What happened
    outcome: AttemptOutcome,
}

impl GenerationAttempt {
    /// Records an attempt.
    pub fn new(
        sequence_number: u32,
        model_used: impl Into<String>,
        started_at: DateTime<Utc>,
        outcome: AttemptOutcome,
    ) -> Self {
        Self {
            sequence_number,
            model_used: model_used.into(),
            started_at,
            outcome,
        }
    }
}

/// Final outcome of a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationOutcome {
    /// A model produced text.
    Generated {
        /// Extracted text
        text: String,
        /// Model that produced it
        model: String,
    },
    /// The hard deadline elapsed without success.
    DeadlineExceeded,
}

/// Outcome of a generation run plus its attempt log.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct GenerationReport {
    /// Final outcome
    outcome: GenerationOutcome,
    /// Every attempt made, in order
    attempts: Vec<GenerationAttempt>,
}

impl GenerationReport {
    /// Creates a report.
    pub fn new(outcome: GenerationOutcome, attempts: Vec<GenerationAttempt>) -> Self {
        Self { outcome, attempts }
    }

    /// Text to deliver: the generated text, or the fallback message.
    pub fn text(&self) -> &str {
        match &self.outcome {
            GenerationOutcome::Generated { text, .. } => text,
            GenerationOutcome::DeadlineExceeded => GENERATION_FALLBACK_TEXT,
        }
    }

    /// Consumes the report, returning the text to deliver.
    pub fn into_text(self) -> String {
        match self.outcome {
            GenerationOutcome::Generated { text, .. } => text,
            GenerationOutcome::DeadlineExceeded => GENERATION_FALLBACK_TEXT.to_string(),
        }
    }

    /// Whether the run fell back to the fixed text.
    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, GenerationOutcome::DeadlineExceeded)
    }
}
