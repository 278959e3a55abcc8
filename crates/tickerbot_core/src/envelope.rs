//! Typed view of a `generateContent` reply.
//!
//! Every level of the tree is optional. The backend omits `candidates` when a
//! prompt is blocked, omits `content` when a candidate is cut short by safety
//! filtering, and may send parts without text (for example function calls),
//! so nothing here is allowed to assume presence.

use serde::{Deserialize, Serialize};

/// Top-level reply from the generation backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// Candidate completions
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    /// Feedback about the prompt, e.g. a block reason
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    /// Token accounting
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

/// One candidate completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content
    #[serde(default)]
    pub content: Option<Content>,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Content of a candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// Ordered content parts
    #[serde(default)]
    pub parts: Option<Vec<Part>>,
    /// Producer role, usually "model"
    #[serde(default)]
    pub role: Option<String>,
}

/// One content part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text payload
    #[serde(default)]
    pub text: Option<String>,
}

/// Feedback about the prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Reason the prompt was blocked
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Token usage reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_token_count: Option<u64>,
    /// Output tokens
    #[serde(default)]
    pub candidates_token_count: Option<u64>,
    /// Total tokens
    #[serde(default)]
    pub total_token_count: Option<u64>,
}

impl ResponseEnvelope {
    /// Envelope with a single candidate holding the given text parts.
    ///
    /// # Examples
    ///
    /// ```
    /// use tickerbot_core::ResponseEnvelope;
    ///
    /// let envelope = ResponseEnvelope::from_texts(["Markets rallied."]);
    /// assert_eq!(envelope.candidates.as_ref().map(Vec::len), Some(1));
    /// ```
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts = texts
            .into_iter()
            .map(|t| Part {
                text: Some(t.into()),
            })
            .collect();
        Self {
            candidates: Some(vec![Candidate {
                content: Some(Content {
                    parts: Some(parts),
                    role: Some("model".to_string()),
                }),
                finish_reason: Some("STOP".to_string()),
            }]),
            ..Self::default()
        }
    }

    /// Block reason from prompt feedback, if the backend reported one.
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }

    /// Finish reasons of all candidates, for diagnostics.
    pub fn finish_reasons(&self) -> Vec<&str> {
        self.candidates
            .iter()
            .flatten()
            .filter_map(|c| c.finish_reason.as_deref())
            .collect()
    }
}
