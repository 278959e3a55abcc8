//! The tickerbot daily market report.
//!
//! This crate glues the pipeline together:
//! - [`BotConfig`] - TOML plus environment configuration
//! - [`YahooQuoteSource`] - market data the report is written from
//! - [`PromptTemplate`] - renders that data into a prompt
//! - [`ReportJob`] - fetch, generate, segment, deliver; registered with the scheduler
//! - [`CommandListener`] - `/report` and friends over Telegram long polling

#![warn(missing_docs)]

mod config;
mod listener;
mod market;
mod metrics;
mod prompt;
mod report;

pub use config::{
    BotConfig, DEFAULT_MARKET_API_BASE, ENV_PREFIX, GeminiSettings, MarketSettings,
    ReportSettings, ScheduleSettings, TelegramSettings,
};
pub use listener::{
    Command, CommandListener, HELP_TEXT, REPORT_BUSY_TEXT, REPORT_STARTED_TEXT,
};
pub use market::{YahooQuoteSource, format_quotes};
pub use metrics::ReportMetrics;
pub use prompt::{DEFAULT_PROMPT_TEMPLATE, PromptTemplate};
pub use report::{REPORT_IN_PROGRESS, REPORT_TASK_NAME, ReportJob};
