//! Latest closes from the Yahoo Finance chart endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tickerbot_error::{MarketDataError, MarketDataErrorKind};
use tickerbot_interface::{Quote, QuoteSource};
use tracing::{debug, instrument, warn};

#[derive(Debug, Default, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    chart: Option<Chart>,
}

#[derive(Debug, Default, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartError {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
    #[serde(default)]
    regular_market_time: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Option<Vec<QuoteSeries>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Option<Vec<Option<f64>>>,
}

impl ChartResult {
    /// Closes paired with their timestamps, skipping gaps.
    fn closes(&self) -> Vec<(Option<i64>, f64)> {
        let closes = self
            .indicators
            .as_ref()
            .and_then(|i| i.quote.as_ref())
            .and_then(|q| q.first())
            .and_then(|s| s.close.as_ref());
        let Some(closes) = closes else {
            return Vec::new();
        };
        closes
            .iter()
            .enumerate()
            .filter_map(|(i, close)| {
                let ts = self.timestamp.as_ref().and_then(|t| t.get(i).copied());
                close.map(|c| (ts, c))
            })
            .collect()
    }

    fn into_quote(self, symbol: &str) -> Option<Quote> {
        let closes = self.closes();
        let meta = self.meta.unwrap_or_default();

        let (as_of, close) = match closes.last() {
            Some((ts, close)) => (*ts, *close),
            None => (meta.regular_market_time, meta.regular_market_price?),
        };
        let previous_close = if closes.len() >= 2 {
            closes.get(closes.len() - 2).map(|(_, c)| *c)
        } else {
            meta.chart_previous_close
        };

        Some(Quote::new(
            symbol,
            close,
            previous_close,
            meta.currency,
            as_of.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
        ))
    }
}

/// Quote source backed by the Yahoo Finance v8 chart API.
#[derive(Debug, Clone)]
pub struct YahooQuoteSource {
    client: Client,
    api_base: String,
    range: String,
    interval: String,
}

impl YahooQuoteSource {
    /// Creates a quote source.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_base: impl Into<String>,
        range: impl Into<String>,
        interval: impl Into<String>,
    ) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .user_agent(concat!("tickerbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MarketDataError::new(MarketDataErrorKind::ResponseParsing(e.to_string())))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            range: range.into(),
            interval: interval.into(),
        })
    }

    #[instrument(skip(self))]
    async fn fetch_one(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let url = format!("{}/v8/finance/chart/{}", self.api_base, symbol);
        let response = self
            .client
            .get(&url)
            .query(&[("range", self.range.as_str()), ("interval", self.interval.as_str())])
            .send()
            .await
            .map_err(|e| {
                MarketDataError::new(MarketDataErrorKind::Http {
                    symbol: symbol.to_string(),
                    message: e.to_string(),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::new(MarketDataErrorKind::HttpStatus {
                symbol: symbol.to_string(),
                status_code: status.as_u16(),
            }));
        }

        let envelope: ChartEnvelope = response.json().await.map_err(|e| {
            MarketDataError::new(MarketDataErrorKind::ResponseParsing(format!(
                "{symbol}: {e}"
            )))
        })?;

        let chart = envelope.chart.unwrap_or_default();
        if let Some(description) = chart.error.and_then(|e| e.description) {
            debug!(symbol, %description, "Chart API reported an error");
        }

        chart
            .result
            .and_then(|results| results.into_iter().next())
            .and_then(|result| result.into_quote(symbol))
            .ok_or_else(|| MarketDataError::new(MarketDataErrorKind::MissingQuote(symbol.to_string())))
    }
}

#[async_trait]
impl QuoteSource for YahooQuoteSource {
    #[instrument(skip(self), fields(count = symbols.len()))]
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, MarketDataError> {
        let mut quotes = Vec::with_capacity(symbols.len());
        for symbol in symbols.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            match self.fetch_one(symbol).await {
                Ok(quote) => quotes.push(quote),
                Err(e) => warn!(symbol, error = %e, "Skipping symbol"),
            }
        }

        if quotes.is_empty() {
            return Err(MarketDataError::new(MarketDataErrorKind::NoData));
        }
        debug!(fetched = quotes.len(), "Fetched quotes");
        Ok(quotes)
    }
}

/// Render quotes as the data blob handed to the prompt, one `SYMBOL: price` line each.
///
/// # Examples
///
/// ```
/// use tickerbot_bot::format_quotes;
/// use tickerbot_interface::Quote;
///
/// let quotes = vec![
///     Quote::new("AAPL", 110.0, Some(100.0), Some("USD".to_string()), None),
///     Quote::new("^GSPC", 5000.5, None, None, None),
/// ];
/// assert_eq!(format_quotes(&quotes), "AAPL: 110.00 USD (+10.00%)\n^GSPC: 5000.50");
/// ```
pub fn format_quotes(quotes: &[Quote]) -> String {
    quotes
        .iter()
        .map(|quote| {
            let mut line = format!("{}: {:.2}", quote.symbol(), quote.close());
            if let Some(currency) = quote.currency() {
                line.push(' ');
                line.push_str(currency);
            }
            if let Some(change) = quote.change_percent() {
                line.push_str(&format!(" ({change:+.2}%)"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
