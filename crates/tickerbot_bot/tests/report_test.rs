//! Report job runs against in-memory collaborators.

use async_trait::async_trait;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tickerbot_bot::{BotConfig, REPORT_IN_PROGRESS, REPORT_TASK_NAME, ReportJob};
use tickerbot_core::{GenerationCall, ImageSource, ParseMode, ResponseEnvelope};
use tickerbot_error::{
    GeminiError, GeminiErrorKind, MarketDataError, MarketDataErrorKind, TelegramResult,
    TickerErrorKind,
};
use tickerbot_interface::{
    Messenger, Quote, QuoteSource, ScheduledTask, SentMessage, TaskOutcome, TextGenerator,
};

struct FixedQuotes {
    quotes: Vec<Quote>,
}

#[async_trait]
impl QuoteSource for FixedQuotes {
    async fn fetch_quotes(&self, _symbols: &[String]) -> Result<Vec<Quote>, MarketDataError> {
        if self.quotes.is_empty() {
            return Err(MarketDataError::new(MarketDataErrorKind::NoData));
        }
        Ok(self.quotes.clone())
    }
}

/// Generator that answers after `delay`, or fails every call when `reply` is None.
struct StubGenerator {
    reply: Option<String>,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate_content(
        &self,
        call: &GenerationCall,
    ) -> Result<ResponseEnvelope, GeminiError> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(call.prompt().clone());
        tokio::time::sleep(self.delay).await;
        match &self.reply {
            Some(reply) => Ok(ResponseEnvelope::from_texts([reply.clone()])),
            None => Err(GeminiError::new(GeminiErrorKind::HttpError {
                status_code: 503,
                message: "UNAVAILABLE".to_string(),
            })),
        }
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Sent {
    Text(String),
    Image(String),
}

#[derive(Default)]
struct RecordingMessenger {
    sent: Mutex<Vec<(String, Sent)>>,
}

impl RecordingMessenger {
    fn sent(&self) -> Vec<(String, Sent)> {
        self.sent.lock().expect("sent lock").clone()
    }

    fn push(&self, chat_id: &str, item: Sent) -> TelegramResult<SentMessage> {
        let mut sent = self.sent.lock().expect("sent lock");
        sent.push((chat_id.to_string(), item));
        Ok(SentMessage::new(i64::try_from(sent.len()).unwrap_or_default()))
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        _parse_mode: ParseMode,
    ) -> TelegramResult<SentMessage> {
        self.push(chat_id, Sent::Text(text.to_string()))
    }

    async fn send_image(
        &self,
        chat_id: &str,
        image: &ImageSource,
        caption: &str,
        _parse_mode: ParseMode,
    ) -> TelegramResult<SentMessage> {
        assert!(matches!(image, ImageSource::Path(_)));
        self.push(chat_id, Sent::Image(caption.to_string()))
    }
}

const CONFIG: &str = r#"
[gemini]
api_key = "k"
models = ["model-a", "model-b"]
per_call_timeout_secs = 5
hard_deadline_secs = 20

[telegram]
token = "t"
chat_id = "-1001"

[market]
symbols = ["AAPL"]
"#;

fn apple() -> Vec<Quote> {
    vec![Quote::new("AAPL", 110.0, Some(100.0), Some("USD".to_string()), None)]
}

fn job(
    config: &str,
    quotes: Vec<Quote>,
    generator: Arc<StubGenerator>,
    messenger: Arc<RecordingMessenger>,
) -> ReportJob {
    let config = BotConfig::from_toml_str(config).expect("valid config");
    ReportJob::from_config(
        &config,
        Arc::new(FixedQuotes { quotes }),
        generator,
        messenger,
    )
    .expect("job")
}

#[tokio::test]
async fn test_report_is_generated_and_delivered() {
    let generator = Arc::new(StubGenerator::replying("Markets rose 1.5%!"));
    let messenger = Arc::new(RecordingMessenger::default());
    let job = job(CONFIG, apple(), generator.clone(), messenger.clone());

    assert_eq!(job.name(), REPORT_TASK_NAME);
    let outcome = job.run().await.expect("run succeeds");
    assert_eq!(outcome, TaskOutcome::Completed);

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("AAPL: 110.00 USD (+10.00%)"));

    assert_eq!(
        messenger.sent(),
        vec![(
            "-1001".to_string(),
            Sent::Text(r"Markets rose 1\.5%\!".to_string())
        )]
    );
}

#[tokio::test]
async fn test_market_failure_fails_the_run() {
    let generator = Arc::new(StubGenerator::replying("unused"));
    let messenger = Arc::new(RecordingMessenger::default());
    let job = job(CONFIG, Vec::new(), generator.clone(), messenger.clone());

    let err = job.run().await.expect_err("run fails");
    assert!(matches!(err.kind(), TickerErrorKind::MarketData(_)));
    assert!(generator.prompts().is_empty());
    assert!(messenger.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_delivers_fallback_text() {
    let generator = Arc::new(StubGenerator::failing());
    let messenger = Arc::new(RecordingMessenger::default());
    let job = job(CONFIG, apple(), generator.clone(), messenger.clone());

    let outcome = job.run().await.expect("run completes");
    assert_eq!(outcome, TaskOutcome::Completed);
    assert!(generator.prompts().len() > 1);

    let sent = messenger.sent();
    assert_eq!(sent.len(), 1);
    match &sent[0].1 {
        Sent::Text(text) => assert!(text.contains("Report generation failed")),
        other => panic!("unexpected send {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_trigger_is_skipped() {
    let generator = Arc::new(StubGenerator {
        reply: Some("done".to_string()),
        delay: Duration::from_secs(3),
        prompts: Mutex::new(Vec::new()),
    });
    let messenger = Arc::new(RecordingMessenger::default());
    let job = Arc::new(job(CONFIG, apple(), generator.clone(), messenger.clone()));

    let first = tokio::spawn({
        let job = job.clone();
        async move { job.run().await }
    });
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(job.is_running());

    let second = job.run().await.expect("skip is not an error");
    assert_eq!(second, TaskOutcome::Skipped(REPORT_IN_PROGRESS.to_string()));

    let first = first.await.expect("join").expect("first run");
    assert_eq!(first, TaskOutcome::Completed);
    assert!(!job.is_running());
    assert_eq!(generator.prompts().len(), 1);
    assert_eq!(messenger.sent().len(), 1);
}

#[tokio::test]
async fn test_chart_is_attached_when_present() {
    let mut chart = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("temp file");
    chart.write_all(b"\x89PNG").expect("write chart");

    let config = format!(
        "{CONFIG}\n[report]\nchart_path = \"{}\"\n",
        chart.path().display()
    );
    let generator = Arc::new(StubGenerator::replying("Chart attached"));
    let messenger = Arc::new(RecordingMessenger::default());
    let job = job(&config, apple(), generator, messenger.clone());

    job.run().await.expect("run succeeds");
    assert_eq!(
        messenger.sent(),
        vec![("-1001".to_string(), Sent::Image("Chart attached".to_string()))]
    );
}

#[tokio::test]
async fn test_missing_chart_sends_text_only() {
    let config = format!("{CONFIG}\n[report]\nchart_path = \"/nonexistent/chart.png\"\n");
    let generator = Arc::new(StubGenerator::replying("No chart"));
    let messenger = Arc::new(RecordingMessenger::default());
    let job = job(&config, apple(), generator, messenger.clone());

    job.run().await.expect("run succeeds");
    assert_eq!(
        messenger.sent(),
        vec![("-1001".to_string(), Sent::Text("No chart".to_string()))]
    );
}
