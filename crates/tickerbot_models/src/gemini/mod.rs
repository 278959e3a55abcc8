//! Gemini `generateContent` over REST.

mod client;
mod dto;

pub use client::{DEFAULT_GEMINI_API_BASE, GeminiClient, normalize_model_name};
pub use dto::{GenerateContentRequest, GenerationConfig, RequestContent, RequestPart};
