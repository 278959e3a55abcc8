//! Error types for the tickerbot report pipeline.
//!
//! Every failure domain has a `<Domain>ErrorKind` enum and a `<Domain>Error`
//! struct that records where the error was created. [`TickerError`] wraps all
//! of them for callers that cross domain boundaries.

#![warn(missing_docs)]

mod config;
mod error;
mod gemini;
mod market;
mod telegram;

pub use config::{ConfigError, TemplateError};
pub use error::{TickerError, TickerErrorKind, TickerResult};
pub use gemini::{GeminiError, GeminiErrorKind, RetryableError};
pub use market::{MarketDataError, MarketDataErrorKind};
pub use telegram::{TelegramError, TelegramErrorKind, TelegramResult};
