//! Formatting modes and image attachments.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Formatting syntax the destination applies to outgoing text.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ParseMode {
    /// Telegram MarkdownV2
    #[default]
    #[serde(alias = "markdownv2", alias = "markdown_v2")]
    #[strum(serialize = "MarkdownV2")]
    MarkdownV2,
    /// Legacy Telegram Markdown
    #[serde(alias = "markdown")]
    #[strum(serialize = "Markdown")]
    Markdown,
    /// No formatting; text is sent verbatim
    #[serde(alias = "plain", alias = "none")]
    #[strum(serialize = "Plain")]
    Plain,
}

impl ParseMode {
    /// Value for the Bot API `parse_mode` field, `None` for plain text.
    pub fn api_value(&self) -> Option<&'static str> {
        match self {
            ParseMode::MarkdownV2 => Some("MarkdownV2"),
            ParseMode::Markdown => Some("Markdown"),
            ParseMode::Plain => None,
        }
    }
}

/// Image attached to the first chunk of a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSource {
    /// Local file, uploaded
    Path(PathBuf),
    /// Remote URL, fetched by the transport
    Url(String),
    /// In-memory image, uploaded
    Bytes {
        /// Encoded image data
        data: Vec<u8>,
        /// File name presented to the transport
        file_name: String,
    },
}
