//! Telegram-specific error types.
//!
//! Covers transport failures, Bot API rejections and local problems such as
//! an unreadable chart image.

use std::fmt;

/// Telegram error variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TelegramErrorKind {
    /// Bot token is missing or empty.
    MissingToken,

    /// Destination chat identifier is missing or empty.
    MissingChatId,

    /// Request failed before a status code was received.
    Http(String),

    /// Bot API answered with `ok = false`.
    Api {
        /// Telegram error code, when present
        error_code: Option<i64>,
        /// Human readable description from Telegram
        description: String,
    },

    /// Reply body could not be decoded.
    ResponseParsing(String),

    /// Image attachment could not be read.
    ImageUnavailable(String),

    /// Message text exceeds the transport limit.
    MessageTooLong {
        /// Length of the rejected text in characters
        length: usize,
        /// Limit that applied
        limit: usize,
    },
}

impl fmt::Display for TelegramErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(f, "Telegram bot token is not configured"),
            Self::MissingChatId => write!(f, "Telegram chat id is not configured"),
            Self::Http(msg) => write!(f, "HTTP error: {msg}"),
            Self::Api {
                error_code: Some(code),
                description,
            } => write!(f, "Bot API error {code}: {description}"),
            Self::Api {
                error_code: None,
                description,
            } => write!(f, "Bot API error: {description}"),
            Self::ResponseParsing(msg) => write!(f, "Failed to parse response: {msg}"),
            Self::ImageUnavailable(msg) => write!(f, "Image unavailable: {msg}"),
            Self::MessageTooLong { length, limit } => {
                write!(f, "Message of {length} characters exceeds limit of {limit}")
            }
        }
    }
}

/// Telegram error with source location tracking.
#[derive(Debug, Clone)]
pub struct TelegramError {
    /// The kind of error that occurred
    pub kind: TelegramErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl TelegramError {
    /// Create a new TelegramError with automatic location tracking.
    ///
    /// # Example
    /// ```
    /// use tickerbot_error::{TelegramError, TelegramErrorKind};
    ///
    /// let err = TelegramError::new(TelegramErrorKind::MissingToken);
    /// assert!(err.to_string().contains("token"));
    /// ```
    #[track_caller]
    pub fn new(kind: TelegramErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl fmt::Display for TelegramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Telegram Error: {} at line {} in {}",
            self.kind, self.line, self.file
        )
    }
}

impl std::error::Error for TelegramError {}

/// Result type for Telegram operations.
pub type TelegramResult<T> = Result<T, TelegramError>;
