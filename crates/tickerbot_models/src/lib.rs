//! Generation backend for the tickerbot report pipeline.
//!
//! - [`GeminiClient`] issues single `generateContent` calls over REST
//! - [`extract_text`] pulls usable text out of a reply envelope
//! - [`RetryOrchestrator`] rotates models with backoff until a deadline

#![warn(missing_docs)]

mod extractor;
mod gemini;
mod orchestrator;

pub use extractor::extract_text;
pub use gemini::{
    DEFAULT_GEMINI_API_BASE, GeminiClient, GenerateContentRequest, GenerationConfig,
    RequestContent, RequestPart, normalize_model_name,
};
pub use orchestrator::RetryOrchestrator;
