//! Market data error types.

/// Error kinds for market data retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum MarketDataErrorKind {
    /// Request failed before a status code was received.
    #[display("HTTP error for {symbol}: {message}")]
    Http {
        /// Symbol being fetched
        symbol: String,
        /// Error message
        message: String,
    },
    /// Data provider answered with a non-success status.
    #[display("HTTP {status_code} for {symbol}")]
    HttpStatus {
        /// Symbol being fetched
        symbol: String,
        /// HTTP status code
        status_code: u16,
    },
    /// Reply carried no usable closing price.
    #[display("No quote available for {_0}")]
    MissingQuote(String),
    /// Reply body could not be decoded.
    #[display("Failed to parse market data: {_0}")]
    ResponseParsing(String),
    /// No configured symbol produced a quote.
    #[display("No market data available for any configured symbol")]
    NoData,
}

/// Market data error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Market Data Error: {} at line {} in {}", kind, line, file)]
pub struct MarketDataError {
    kind: MarketDataErrorKind,
    line: u32,
    file: &'static str,
}

impl MarketDataError {
    /// Create a new market data error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: MarketDataErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &MarketDataErrorKind {
        &self.kind
    }
}
