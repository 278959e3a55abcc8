//! Bot configuration.
//!
//! Loaded from a TOML file and layered with `TICKERBOT__SECTION__KEY`
//! environment overrides, e.g. `TICKERBOT__TELEGRAM__TOKEN`.

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tickerbot_core::{GenerationRequest, GenerationRequestBuilder, MetricsConfig, ParseMode};
use tickerbot_error::ConfigError;
use tickerbot_models::DEFAULT_GEMINI_API_BASE;
use tickerbot_rate_limit::BackoffPolicy;
use tickerbot_server::{DailySchedule, parse_report_time, parse_timezone};
use tickerbot_social::{
    DEFAULT_CAPTION_LIMIT, DEFAULT_MESSAGE_LIMIT, DEFAULT_TELEGRAM_API_BASE, SegmentLimits,
    TELEGRAM_CAPTION_MAX_CHARS, TELEGRAM_MESSAGE_MAX_CHARS,
};
use typed_builder::TypedBuilder;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "TICKERBOT";

/// Default Yahoo Finance endpoint.
pub const DEFAULT_MARKET_API_BASE: &str = "https://query1.finance.yahoo.com";

/// Full bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Getters, TypedBuilder)]
pub struct BotConfig {
    /// Generation backend settings
    gemini: GeminiSettings,
    /// Chat transport settings
    telegram: TelegramSettings,
    /// Daily trigger settings
    #[serde(default)]
    #[builder(default)]
    schedule: ScheduleSettings,
    /// Market data settings
    #[serde(default)]
    #[builder(default)]
    market: MarketSettings,
    /// Report rendering settings
    #[serde(default)]
    #[builder(default)]
    report: ReportSettings,
    /// Metrics export settings
    #[serde(default)]
    #[builder(default)]
    metrics: MetricsConfig,
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Getters, TypedBuilder)]
pub struct GeminiSettings {
    /// API key
    #[builder(setter(into))]
    api_key: String,
    /// Base URL of the REST API
    #[serde(default = "default_gemini_api_base")]
    #[builder(default = default_gemini_api_base(), setter(into))]
    api_base: String,
    /// Model candidates, tried round-robin
    #[serde(default = "default_models")]
    #[builder(default = default_models())]
    models: Vec<String>,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    #[builder(default = default_temperature())]
    temperature: f32,
    /// Maximum output tokens per call
    #[serde(default = "default_max_output_tokens")]
    #[builder(default = default_max_output_tokens())]
    max_output_tokens: u32,
    /// Bound on one generation call
    #[serde(default = "default_per_call_timeout_secs")]
    #[builder(default = default_per_call_timeout_secs())]
    per_call_timeout_secs: u64,
    /// Bound on the whole generation
    #[serde(default = "default_hard_deadline_secs")]
    #[builder(default = default_hard_deadline_secs())]
    hard_deadline_secs: u64,
    /// Cap on the wait between attempts
    #[serde(default = "default_max_backoff_secs")]
    #[builder(default = default_max_backoff_secs())]
    max_backoff_secs: u64,
}

/// `[telegram]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Getters, TypedBuilder)]
pub struct TelegramSettings {
    /// Bot token
    #[builder(setter(into))]
    token: String,
    /// Destination chat for reports
    #[builder(setter(into))]
    chat_id: String,
    /// Formatting mode
    #[serde(default)]
    #[builder(default)]
    parse_mode: ParseMode,
    /// Base URL of the Bot API
    #[serde(default = "default_telegram_api_base")]
    #[builder(default = default_telegram_api_base(), setter(into))]
    api_base: String,
    /// Message size limit in characters
    #[serde(default = "default_message_limit")]
    #[builder(default = default_message_limit())]
    message_limit: usize,
    /// Caption size limit in characters
    #[serde(default = "default_caption_limit")]
    #[builder(default = default_caption_limit())]
    caption_limit: usize,
    /// Bound on one outbound Bot API call
    #[serde(default = "default_send_timeout_secs")]
    #[builder(default = default_send_timeout_secs())]
    send_timeout_secs: u64,
    /// Long-poll timeout for inbound commands
    #[serde(default = "default_poll_timeout_secs")]
    #[builder(default = default_poll_timeout_secs())]
    poll_timeout_secs: u64,
    /// Outbound pacing; 0 disables it
    #[serde(default = "default_sends_per_second")]
    #[builder(default = default_sends_per_second())]
    sends_per_second: u32,
    /// Chats allowed to issue commands; empty allows every chat
    #[serde(default)]
    #[builder(default)]
    allowed_chat_ids: Vec<i64>,
}

/// `[schedule]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Getters, TypedBuilder)]
pub struct ScheduleSettings {
    /// Daily trigger time, "HH:MM"
    #[serde(default = "default_report_time")]
    #[builder(default = default_report_time(), setter(into))]
    report_time: String,
    /// IANA timezone the trigger time is read in
    #[serde(default = "default_timezone")]
    #[builder(default = default_timezone(), setter(into))]
    timezone: String,
    /// Scheduler polling period
    #[serde(default = "default_poll_interval_secs")]
    #[builder(default = default_poll_interval_secs())]
    poll_interval_secs: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// `[market]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Getters, TypedBuilder)]
pub struct MarketSettings {
    /// Ticker symbols to report on
    #[serde(default = "default_symbols")]
    #[builder(default = default_symbols())]
    symbols: Vec<String>,
    /// History range requested per symbol
    #[serde(default = "default_range")]
    #[builder(default = default_range(), setter(into))]
    range: String,
    /// Bar interval
    #[serde(default = "default_interval")]
    #[builder(default = default_interval(), setter(into))]
    interval: String,
    /// Base URL of the quote endpoint
    #[serde(default = "default_market_api_base")]
    #[builder(default = default_market_api_base(), setter(into))]
    api_base: String,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// `[report]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Getters, TypedBuilder)]
pub struct ReportSettings {
    /// Prompt template file; the built-in template is used when unset
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    prompt_template: Option<PathBuf>,
    /// Chart image attached to the first chunk when the file exists
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    chart_path: Option<PathBuf>,
    /// Language the report is requested in
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    language: Option<String>,
}

fn default_gemini_api_base() -> String {
    DEFAULT_GEMINI_API_BASE.to_string()
}
fn default_models() -> Vec<String> {
    vec!["gemini-2.5-pro".to_string(), "gemini-2.5-flash".to_string()]
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_output_tokens() -> u32 {
    8192
}
fn default_per_call_timeout_secs() -> u64 {
    60
}
fn default_hard_deadline_secs() -> u64 {
    300
}
fn default_max_backoff_secs() -> u64 {
    64
}
fn default_telegram_api_base() -> String {
    DEFAULT_TELEGRAM_API_BASE.to_string()
}
fn default_message_limit() -> usize {
    DEFAULT_MESSAGE_LIMIT
}
fn default_caption_limit() -> usize {
    DEFAULT_CAPTION_LIMIT
}
fn default_send_timeout_secs() -> u64 {
    30
}
fn default_poll_timeout_secs() -> u64 {
    30
}
fn default_sends_per_second() -> u32 {
    1
}
fn default_report_time() -> String {
    "08:00".to_string()
}
fn default_timezone() -> String {
    "UTC".to_string()
}
fn default_poll_interval_secs() -> u64 {
    1
}
fn default_symbols() -> Vec<String> {
    ["AAPL", "MSFT", "NVDA", "^GSPC"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_range() -> String {
    "5d".to_string()
}
fn default_interval() -> String {
    "1d".to_string()
}
fn default_market_api_base() -> String {
    DEFAULT_MARKET_API_BASE.to_string()
}

impl BotConfig {
    /// Load configuration from an optional TOML file plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a value has the wrong
    /// type, or validation fails.
    #[tracing::instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        Self::finish(builder.add_source(environment()))
    }

    /// Parse configuration from TOML text, without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::finish(Config::builder().add_source(File::from_str(content, FileFormat::Toml)))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ConfigError::new(format!("Failed to load config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values a type alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(ConfigError::new("gemini.api_key is required"));
        }
        if self.telegram.token.trim().is_empty() {
            return Err(ConfigError::new("telegram.token is required"));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(ConfigError::new("telegram.chat_id is required"));
        }
        if self.market.symbols.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::new("market.symbols must name at least one symbol"));
        }
        if self.telegram.message_limit > TELEGRAM_MESSAGE_MAX_CHARS {
            return Err(ConfigError::new(format!(
                "telegram.message_limit must not exceed {TELEGRAM_MESSAGE_MAX_CHARS}"
            )));
        }
        if self.telegram.caption_limit > TELEGRAM_CAPTION_MAX_CHARS {
            return Err(ConfigError::new(format!(
                "telegram.caption_limit must not exceed {TELEGRAM_CAPTION_MAX_CHARS}"
            )));
        }
        if self.telegram.send_timeout_secs == 0 {
            return Err(ConfigError::new("telegram.send_timeout_secs must be positive"));
        }
        if self.schedule.poll_interval_secs == 0 {
            return Err(ConfigError::new("schedule.poll_interval_secs must be positive"));
        }
        self.segment_limits()?;
        self.report_schedule()?;
        self.metrics.validate()?;
        self.generation_request()
            .prompt(String::new())
            .build()
            .map_err(|e| ConfigError::new(format!("invalid [gemini] settings: {e}")))?;
        Ok(())
    }

    /// Generation request with everything but the prompt filled in.
    pub fn generation_request(&self) -> GenerationRequestBuilder {
        let mut builder = GenerationRequest::builder();
        builder
            .model_candidates(
                self.gemini
                    .models
                    .iter()
                    .map(|m| m.trim().to_string())
                    .collect::<Vec<_>>(),
            )
            .temperature(self.gemini.temperature)
            .max_output_tokens(self.gemini.max_output_tokens)
            .per_call_timeout(Duration::from_secs(self.gemini.per_call_timeout_secs))
            .hard_deadline(Duration::from_secs(self.gemini.hard_deadline_secs));
        builder
    }

    /// Backoff between generation attempts.
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::with_max_backoff(Duration::from_secs(self.gemini.max_backoff_secs))
    }

    /// Message and caption limits.
    ///
    /// # Errors
    ///
    /// Returns an error if a limit is too small to hold an escaped character.
    pub fn segment_limits(&self) -> Result<SegmentLimits, ConfigError> {
        SegmentLimits::new(self.telegram.message_limit, self.telegram.caption_limit)
    }

    /// Daily report schedule.
    ///
    /// # Errors
    ///
    /// Returns an error if the time or timezone does not parse.
    pub fn report_schedule(&self) -> Result<DailySchedule, ConfigError> {
        DailySchedule::parse(&self.schedule.report_time, &self.schedule.timezone)
    }

    /// Timezone reports are dated in.
    ///
    /// # Errors
    ///
    /// Returns an error if the timezone is unknown.
    pub fn timezone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        parse_timezone(&self.schedule.timezone)
    }

    /// One-line summary without secrets, for `check-config` and startup logs.
    pub fn summary(&self) -> String {
        let report_time = parse_report_time(&self.schedule.report_time)
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|_| self.schedule.report_time.clone());
        format!(
            "models=[{}] chat={} time={} {} symbols=[{}] mode={} deadline={}s metrics={}",
            self.gemini.models.join(", "),
            self.telegram.chat_id,
            report_time,
            self.schedule.timezone,
            self.market.symbols.join(", "),
            self.telegram.parse_mode,
            self.gemini.hard_deadline_secs,
            self.metrics.exporter(),
        )
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("gemini.models")
        .with_list_parse_key("market.symbols")
        .with_list_parse_key("telegram.allowed_chat_ids")
        .try_parsing(true)
}
