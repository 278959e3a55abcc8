//! Crate-level error aggregation.

use crate::{ConfigError, GeminiError, MarketDataError, TelegramError, TemplateError};

/// Crate-level error variants.
#[derive(Debug, derive_more::From)]
pub enum TickerErrorKind {
    /// Generation backend error
    Gemini(GeminiError),
    /// Chat transport error
    Telegram(TelegramError),
    /// Market data error
    MarketData(MarketDataError),
    /// Configuration error
    Config(ConfigError),
    /// Prompt template error
    Template(TemplateError),
}

impl std::fmt::Display for TickerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickerErrorKind::Gemini(e) => write!(f, "{}", e),
            TickerErrorKind::Telegram(e) => write!(f, "{}", e),
            TickerErrorKind::MarketData(e) => write!(f, "{}", e),
            TickerErrorKind::Config(e) => write!(f, "{}", e),
            TickerErrorKind::Template(e) => write!(f, "{}", e),
        }
    }
}

/// Tickerbot error with kind discrimination.
#[derive(Debug)]
pub struct TickerError(Box<TickerErrorKind>);

impl TickerError {
    /// Create a new error from a kind.
    pub fn new(kind: TickerErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &TickerErrorKind {
        &self.0
    }
}

impl std::fmt::Display for TickerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tickerbot Error: {}", self.0)
    }
}

impl std::error::Error for TickerError {}

// Generic From implementation for any type that converts to TickerErrorKind
impl<T> From<T> for TickerError
where
    T: Into<TickerErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for tickerbot operations.
pub type TickerResult<T> = std::result::Result<T, TickerError>;
