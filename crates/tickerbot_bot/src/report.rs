//! The daily report job: fetch, generate, segment, deliver.

use crate::{BotConfig, PromptTemplate, ReportMetrics, format_quotes};
use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tickerbot_core::{GenerationRequestBuilder, ImageSource};
use tickerbot_error::{ConfigError, TickerResult};
use tickerbot_interface::{Messenger, QuoteSource, ScheduledTask, TaskOutcome, TextGenerator};
use tickerbot_models::RetryOrchestrator;
use tickerbot_social::{DeliveryPipeline, DeliveryReport, MessageSegmenter};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use typed_builder::TypedBuilder;

/// Name the job is registered under.
pub const REPORT_TASK_NAME: &str = "daily_report";

/// Reason given when a trigger arrives while a run is in flight.
pub const REPORT_IN_PROGRESS: &str = "a report is already in progress";

/// One daily report run, end to end.
///
/// At most one run executes at a time; a trigger that finds a run in flight
/// returns [`TaskOutcome::Skipped`] instead of queueing.
#[derive(TypedBuilder)]
pub struct ReportJob {
    quotes: Arc<dyn QuoteSource>,
    symbols: Vec<String>,
    #[builder(default)]
    template: PromptTemplate,
    /// Generation settings; the prompt is filled in per run
    request: GenerationRequestBuilder,
    orchestrator: RetryOrchestrator,
    delivery: DeliveryPipeline,
    #[builder(default, setter(strip_option))]
    chart_path: Option<PathBuf>,
    #[builder(default = Tz::UTC)]
    timezone: Tz,
    #[builder(default, setter(strip_option, into))]
    language: Option<String>,
    #[builder(default)]
    metrics: ReportMetrics,
    #[builder(default, setter(skip))]
    in_flight: Mutex<()>,
}

impl std::fmt::Debug for ReportJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportJob")
            .field("symbols", &self.symbols)
            .field("orchestrator", &self.orchestrator)
            .field("delivery", &self.delivery)
            .field("chart_path", &self.chart_path)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

impl ReportJob {
    /// Wire a job from configuration and its collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is inconsistent or the prompt
    /// template cannot be loaded.
    pub fn from_config(
        config: &BotConfig,
        quotes: Arc<dyn QuoteSource>,
        generator: Arc<dyn TextGenerator>,
        messenger: Arc<dyn Messenger>,
    ) -> TickerResult<Self> {
        let segmenter =
            MessageSegmenter::new(config.segment_limits()?, *config.telegram().parse_mode());
        let delivery = DeliveryPipeline::new(messenger, config.telegram().chat_id(), segmenter);
        let template =
            PromptTemplate::from_optional_file(config.report().prompt_template().as_deref())?;

        Ok(Self {
            quotes,
            symbols: config.market().symbols().clone(),
            template,
            request: config.generation_request(),
            orchestrator: RetryOrchestrator::new(generator, config.backoff()),
            delivery,
            chart_path: config.report().chart_path().clone(),
            timezone: config.timezone()?,
            language: config.report().language().clone(),
            metrics: ReportMetrics::new(),
            in_flight: Mutex::new(()),
        })
    }

    /// Whether a run is executing right now.
    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    async fn chart(&self) -> Option<ImageSource> {
        let path = self.chart_path.as_ref()?;
        match tokio::fs::try_exists(path).await {
            Ok(true) => Some(ImageSource::Path(path.clone())),
            Ok(false) => {
                debug!(path = %path.display(), "No chart image, sending text only");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot check chart image");
                None
            }
        }
    }

    #[instrument(skip(self))]
    async fn execute(&self) -> TickerResult<DeliveryReport> {
        let quotes = self.quotes.fetch_quotes(&self.symbols).await?;
        let data = format_quotes(&quotes);
        debug!(quotes = quotes.len(), "Market data ready");

        let date = Utc::now()
            .with_timezone(&self.timezone)
            .format("%Y-%m-%d")
            .to_string();
        let prompt = self
            .template
            .render(&date, &data, self.language.as_deref())?;
        let request = self
            .request
            .clone()
            .prompt(prompt)
            .build()
            .map_err(|e| ConfigError::new(format!("invalid generation request: {e}")))?;

        let generation = self.orchestrator.generate_report(&request).await;
        self.metrics.record_generation(&generation);
        info!(
            attempts = generation.attempts().len(),
            fallback = generation.is_fallback(),
            "Generation finished"
        );

        let image = self.chart().await;
        let report = self
            .delivery
            .deliver_text(generation.text(), image.as_ref())
            .await;
        self.metrics
            .record_delivery(*report.sent(), report.is_complete());

        if report.is_complete() {
            info!(chunks = report.total(), "Report delivered");
        } else {
            warn!(
                sent = report.sent(),
                total = report.total(),
                "Report delivered partially"
            );
        }
        Ok(report)
    }
}

#[async_trait]
impl ScheduledTask for ReportJob {
    fn name(&self) -> &str {
        REPORT_TASK_NAME
    }

    async fn run(&self) -> TickerResult<TaskOutcome> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!("Report trigger skipped, {}", REPORT_IN_PROGRESS);
            self.metrics.record_skip();
            return Ok(TaskOutcome::Skipped(REPORT_IN_PROGRESS.to_string()));
        };

        let started = Instant::now();
        let result = self.execute().await;
        let elapsed = started.elapsed().as_secs_f64();
        self.metrics.record_run(elapsed, result.is_err());

        match result {
            Ok(_) => Ok(TaskOutcome::Completed),
            Err(e) => {
                error!(error = %e, duration_secs = elapsed, "Report job failed");
                Err(e)
            }
        }
    }
}
