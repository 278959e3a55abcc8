//! tickerbot - a daily AI-written market report delivered to Telegram.
//!
//! Two long-lived loops share one report job: the scheduler fires it at the
//! configured time of day, and the command listener fires it on `/report`.

mod cli;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;
use std::time::Duration;
use tickerbot_bot::{BotConfig, CommandListener, ReportJob, YahooQuoteSource};
use tickerbot_core::init_metrics;
use tickerbot_interface::{ScheduledTask, TaskOutcome};
use tickerbot_models::GeminiClient;
use tickerbot_rate_limit::SendPacer;
use tickerbot_server::Scheduler;
use tickerbot_social::TelegramClient;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How long to wait for the loops to wind down after Ctrl+C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// The report job and the transport it shares with the command listener.
struct App {
    job: Arc<ReportJob>,
    telegram: Arc<TelegramClient>,
}

fn build(config: &BotConfig) -> Result<App> {
    let gemini = GeminiClient::with_api_base(config.gemini().api_key(), config.gemini().api_base())
        .context("creating Gemini client")?;

    let sends_per_second = *config.telegram().sends_per_second();
    let pacer = if sends_per_second == 0 {
        SendPacer::unlimited()
    } else {
        SendPacer::per_second(sends_per_second).context("creating send pacer")?
    };
    let telegram = Arc::new(
        TelegramClient::with_api_base(config.telegram().token(), config.telegram().api_base())
            .context("creating Telegram client")?
            .with_pacer(pacer)
            .with_send_timeout(Duration::from_secs(*config.telegram().send_timeout_secs())),
    );

    let market = config.market();
    let quotes = YahooQuoteSource::new(market.api_base(), market.range(), market.interval())
        .context("creating market data client")?;

    let job = ReportJob::from_config(
        config,
        Arc::new(quotes),
        Arc::new(gemini),
        telegram.clone(),
    )
    .context("building report job")?;

    Ok(App {
        job: Arc::new(job),
        telegram,
    })
}

async fn run_once(app: App) -> Result<()> {
    match app.job.run().await.context("report run failed")? {
        TaskOutcome::Completed => info!("Report run completed"),
        TaskOutcome::Skipped(reason) => warn!(%reason, "Report run skipped"),
    }
    Ok(())
}

async fn run_service(config: &BotConfig, app: App) -> Result<()> {
    let scheduler = Arc::new(Scheduler::new());
    let schedule = config.report_schedule().context("report schedule")?;
    scheduler.register(schedule, app.job.clone(), Utc::now());

    let listener = CommandListener::new(
        app.telegram,
        scheduler.clone(),
        config.telegram().allowed_chat_ids().clone(),
        *config.telegram().poll_timeout_secs(),
    );
    let poll_interval = Duration::from_secs(*config.schedule().poll_interval_secs());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler_loop = tokio::spawn({
        let scheduler = scheduler.clone();
        let shutdown = shutdown_rx.clone();
        async move { scheduler.run(poll_interval, shutdown).await }
    });
    let listener_loop = tokio::spawn(async move { listener.run(shutdown_rx).await });

    info!("tickerbot running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl+C")?;

    info!("Shutting down");
    let _ = shutdown_tx.send(true);
    let loops = async {
        let _ = tokio::join!(scheduler_loop, listener_loop);
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, loops).await.is_err() {
        warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "A report run was still in flight at shutdown, abandoning it"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config_path = cli.config_path();
    info!(config_file = ?config_path, "Loading configuration");
    let config = BotConfig::load(config_path.as_deref()).context("loading configuration")?;

    let command = cli.selected_command();
    if command == Commands::CheckConfig {
        println!("Configuration OK: {}", config.summary());
        return Ok(());
    }

    info!(summary = %config.summary(), "Configuration loaded");
    let metrics = init_metrics("tickerbot", config.metrics()).context("initializing metrics")?;
    let app = build(&config)?;

    let result = match command {
        Commands::Once => run_once(app).await,
        Commands::Run | Commands::CheckConfig => run_service(&config, app).await,
    };

    metrics.shutdown();
    result
}
