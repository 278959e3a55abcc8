//! Generation backend trait.

use async_trait::async_trait;
use tickerbot_core::{GenerationCall, ResponseEnvelope};
use tickerbot_error::GeminiError;

/// A backend that turns one prompt into one loosely-typed reply.
///
/// Implementations perform exactly one request per call and never retry;
/// retries, model rotation and deadlines belong to the orchestrator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Issue one generation call for the model named in `call`.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures and non-success statuses.
    /// A successful reply with no usable text is *not* an error.
    async fn generate_content(&self, call: &GenerationCall)
    -> Result<ResponseEnvelope, GeminiError>;

    /// Name of the provider, for logging.
    fn provider_name(&self) -> &'static str;
}
