//! Market data supplier trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tickerbot_error::MarketDataError;

/// Latest close for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct Quote {
    /// Ticker symbol
    symbol: String,
    /// Most recent closing price
    close: f64,
    /// Previous session's close, when known
    previous_close: Option<f64>,
    /// Quote currency
    currency: Option<String>,
    /// Timestamp of the close
    as_of: Option<DateTime<Utc>>,
}

impl Quote {
    /// Creates a quote.
    pub fn new(
        symbol: impl Into<String>,
        close: f64,
        previous_close: Option<f64>,
        currency: Option<String>,
        as_of: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            close,
            previous_close,
            currency,
            as_of,
        }
    }

    /// Percentage change from the previous close.
    ///
    /// # Examples
    ///
    /// ```
    /// use tickerbot_interface::Quote;
    ///
    /// let quote = Quote::new("AAPL", 110.0, Some(100.0), None, None);
    /// assert_eq!(quote.change_percent(), Some(10.0));
    /// ```
    pub fn change_percent(&self) -> Option<f64> {
        self.previous_close
            .filter(|prev| *prev != 0.0)
            .map(|prev| (self.close - prev) / prev * 100.0)
    }
}

/// Supplier of the data blob the report is written from.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the latest quote for each symbol.
    ///
    /// Symbols that fail individually are skipped.
    ///
    /// # Errors
    ///
    /// Returns error when no symbol produced a quote.
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, MarketDataError>;
}
