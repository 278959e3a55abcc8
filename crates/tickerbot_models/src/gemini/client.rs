//! REST client for Gemini `generateContent`.

use super::dto::{ApiErrorBody, GenerateContentRequest};
use async_trait::async_trait;
use reqwest::Client;
use tickerbot_core::{GenerationCall, ResponseEnvelope};
use tickerbot_error::{GeminiError, GeminiErrorKind};
use tickerbot_interface::TextGenerator;
use tracing::{debug, error, instrument};

/// Public Gemini endpoint.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Strip the optional `models/` resource prefix from a model name.
///
/// # Examples
///
/// ```
/// use tickerbot_models::normalize_model_name;
///
/// assert_eq!(normalize_model_name("models/gemini-2.5-pro"), "gemini-2.5-pro");
/// assert_eq!(normalize_model_name(" gemini-2.5-flash "), "gemini-2.5-flash");
/// ```
pub fn normalize_model_name(model: &str) -> &str {
    let model = model.trim();
    model.strip_prefix("models/").unwrap_or(model)
}

/// Client for the Gemini REST API.
///
/// Performs exactly one HTTP request per [`TextGenerator::generate_content`]
/// call. Retries and model rotation are left to the orchestrator.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl GeminiClient {
    /// Creates a client against the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is blank or the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GeminiError> {
        Self::with_api_base(api_key, DEFAULT_GEMINI_API_BASE)
    }

    /// Creates a client against a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is blank or the HTTP client cannot be built.
    #[instrument(skip(api_key, api_base))]
    pub fn with_api_base(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, GeminiError> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(GeminiError::new(GeminiErrorKind::MissingApiKey));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| GeminiError::new(GeminiErrorKind::ClientCreation(e.to_string())))?;

        let api_base = api_base.into().trim_end_matches('/').to_string();
        debug!(api_base = %api_base, "Created Gemini client");

        Ok(Self {
            client,
            api_key,
            api_base,
        })
    }

    /// Base URL requests are sent to.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Full `generateContent` URL for a model.
    pub fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base,
            normalize_model_name(model)
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    #[instrument(skip(self, call), fields(model = %call.model(), prompt_chars = call.prompt().chars().count()))]
    async fn generate_content(&self, call: &GenerationCall) -> Result<ResponseEnvelope, GeminiError> {
        let body = GenerateContentRequest::from(call);

        let response = self
            .client
            .post(self.endpoint(call.model()))
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(*call.timeout())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "HTTP request failed");
                if e.is_timeout() {
                    GeminiError::new(GeminiErrorKind::Timeout {
                        after_ms: u64::try_from(call.timeout().as_millis()).unwrap_or(u64::MAX),
                    })
                } else {
                    GeminiError::new(GeminiErrorKind::ApiRequest(e.to_string()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&error_text)
                .ok()
                .and_then(|body| body.error)
                .and_then(|detail| match (detail.status, detail.message) {
                    (Some(status), Some(message)) => Some(format!("{status}: {message}")),
                    (None, Some(message)) => Some(message),
                    (Some(status), None) => Some(status),
                    (None, None) => None,
                })
                .unwrap_or(error_text);
            error!(status = %status, error = %message, "Gemini API error");

            return Err(GeminiError::new(GeminiErrorKind::HttpError {
                status_code: status.as_u16(),
                message,
            }));
        }

        let envelope: ResponseEnvelope = response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse response");
            GeminiError::new(GeminiErrorKind::ResponseParsing(e.to_string()))
        })?;

        debug!(
            candidates = envelope.candidates.as_ref().map(Vec::len).unwrap_or(0),
            block_reason = ?envelope.block_reason(),
            "Received response"
        );

        Ok(envelope)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
