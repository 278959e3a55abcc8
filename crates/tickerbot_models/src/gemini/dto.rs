//! Request bodies for the `generateContent` endpoint.
//!
//! Replies decode into [`tickerbot_core::ResponseEnvelope`].

use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tickerbot_core::GenerationCall;

/// One text part of a request turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPart {
    /// Text payload
    pub text: String,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContent {
    /// "user" or "model"
    pub role: String,
    /// Turn parts
    pub parts: Vec<RequestPart>,
}

/// Sampling settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature
    temperature: f32,
    /// Maximum output tokens
    max_output_tokens: u32,
}

/// Body of a `generateContent` request.
#[derive(Debug, Clone, PartialEq, Serialize, Builder, Getters)]
#[serde(rename_all = "camelCase")]
#[builder(setter(into))]
pub struct GenerateContentRequest {
    /// Conversation turns
    contents: Vec<RequestContent>,
    /// Sampling settings
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Creates a new builder for GenerateContentRequest.
    pub fn builder() -> GenerateContentRequestBuilder {
        GenerateContentRequestBuilder::default()
    }
}

impl From<&GenerationCall> for GenerateContentRequest {
    fn from(call: &GenerationCall) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user".to_string(),
                parts: vec![RequestPart {
                    text: call.prompt().clone(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: *call.temperature(),
                max_output_tokens: *call.max_output_tokens(),
            }),
        }
    }
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<ApiErrorDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
