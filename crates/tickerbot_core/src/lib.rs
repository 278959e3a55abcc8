//! Core data types for the tickerbot report pipeline.
//!
//! This crate provides the types shared by the generation backend, the
//! chat transport and the report job.

mod chunk;
mod envelope;
mod generation;
mod media;
mod observability;

pub use chunk::{ChunkRole, MessageChunk};
pub use envelope::{Candidate, Content, Part, PromptFeedback, ResponseEnvelope, UsageMetadata};
pub use generation::{
    AttemptOutcome, GENERATION_FALLBACK_TEXT, GenerationAttempt, GenerationCall,
    GenerationOutcome, GenerationReport, GenerationRequest, GenerationRequestBuilder,
    GenerationRequestBuilderError,
};
pub use media::{ImageSource, ParseMode};
pub use observability::{
    DEFAULT_OTLP_ENDPOINT, MetricsConfig, MetricsExporter, MetricsGuard, init_metrics,
};
