//! Configuration loading and validation.

use std::io::Write;
use std::time::Duration;
use tickerbot_bot::BotConfig;
use tickerbot_core::{MetricsExporter, ParseMode};
use tickerbot_server::DailySchedule;

const MINIMAL: &str = r#"
[gemini]
api_key = "test-key"

[telegram]
token = "123:abc"
chat_id = "-100200300"
"#;

#[test]
fn test_minimal_config_uses_defaults() {
    let config = BotConfig::from_toml_str(MINIMAL).expect("valid config");

    assert_eq!(config.gemini().models(), &["gemini-2.5-pro", "gemini-2.5-flash"]);
    assert_eq!(*config.gemini().hard_deadline_secs(), 300);
    assert_eq!(*config.telegram().parse_mode(), ParseMode::MarkdownV2);
    assert_eq!(*config.telegram().message_limit(), 4000);
    assert_eq!(*config.telegram().caption_limit(), 1000);
    assert_eq!(config.schedule().report_time(), "08:00");
    assert!(config.market().symbols().contains(&"AAPL".to_string()));
    assert!(config.report().chart_path().is_none());
    assert_eq!(*config.telegram().send_timeout_secs(), 30);
    assert_eq!(*config.metrics().exporter(), MetricsExporter::None);
}

#[test]
fn test_full_config() {
    let toml = r#"
[gemini]
api_key = "k"
models = ["models/gemini-2.5-flash", "gemini-2.0-flash"]
temperature = 0.2
per_call_timeout_secs = 20
hard_deadline_secs = 90
max_backoff_secs = 8

[telegram]
token = "t"
chat_id = "42"
parse_mode = "plain"
message_limit = 3000
caption_limit = 900
allowed_chat_ids = [42, 43]

[schedule]
report_time = "07:30"
timezone = "Asia/Shanghai"

[market]
symbols = ["SPY"]

[report]
chart_path = "/tmp/chart.png"
language = "English"
"#;
    let config = BotConfig::from_toml_str(toml).expect("valid config");

    assert_eq!(*config.telegram().parse_mode(), ParseMode::Plain);
    assert_eq!(config.telegram().allowed_chat_ids(), &[42, 43]);
    assert_eq!(
        config.report_schedule().expect("schedule"),
        DailySchedule::parse("07:30", "Asia/Shanghai").expect("valid")
    );
    assert_eq!(*config.backoff().max_backoff(), Duration::from_secs(8));

    let limits = config.segment_limits().expect("limits");
    assert_eq!(*limits.message(), 3000);
    assert_eq!(*limits.caption(), 900);

    let request = config
        .generation_request()
        .prompt("hello")
        .build()
        .expect("request");
    assert_eq!(request.model_candidates().len(), 2);
    assert_eq!(*request.per_call_timeout(), Duration::from_secs(20));
    assert_eq!(*request.hard_deadline(), Duration::from_secs(90));
}

fn rejects(toml: &str, needle: &str) {
    let err = BotConfig::from_toml_str(toml).expect_err("config should be rejected");
    assert!(
        err.message.contains(needle),
        "expected '{needle}' in '{}'",
        err.message
    );
}

#[test]
fn test_missing_section_rejected() {
    rejects("[gemini]\napi_key = \"k\"\n", "telegram");
}

#[test]
fn test_blank_secrets_rejected() {
    rejects(
        "[gemini]\napi_key = \" \"\n[telegram]\ntoken = \"t\"\nchat_id = \"1\"\n",
        "gemini.api_key",
    );
    rejects(
        "[gemini]\napi_key = \"k\"\n[telegram]\ntoken = \"t\"\nchat_id = \"\"\n",
        "telegram.chat_id",
    );
}

#[test]
fn test_deadline_shorter_than_call_timeout_rejected() {
    let toml = MINIMAL.replace(
        "api_key = \"test-key\"",
        "api_key = \"test-key\"\nper_call_timeout_secs = 120\nhard_deadline_secs = 60",
    );
    rejects(&toml, "hard_deadline");
}

#[test]
fn test_blank_model_rejected() {
    let toml = MINIMAL.replace(
        "api_key = \"test-key\"",
        "api_key = \"test-key\"\nmodels = [\"gemini-2.5-pro\", \" \"]",
    );
    rejects(&toml, "must not be blank");
}

#[test]
fn test_bad_schedule_rejected() {
    let bad_time = format!("{MINIMAL}\n[schedule]\nreport_time = \"8 o'clock\"\n");
    rejects(&bad_time, "report time");

    let bad_zone = format!("{MINIMAL}\n[schedule]\ntimezone = \"Nowhere/Special\"\n");
    rejects(&bad_zone, "unknown timezone");
}

#[test]
fn test_limits_above_transport_maximum_rejected() {
    let toml = MINIMAL.replace("chat_id = \"-100200300\"", "chat_id = \"1\"\nmessage_limit = 5000");
    rejects(&toml, "message_limit");
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    file.write_all(MINIMAL.as_bytes()).expect("write config");

    let config = BotConfig::load(Some(file.path())).expect("loads");
    assert_eq!(config.telegram().chat_id(), "-100200300");
}

#[test]
fn test_load_missing_file_fails() {
    let result = BotConfig::load(Some(std::path::Path::new("/nonexistent/tickerbot.toml")));
    assert!(result.is_err());
}

#[test]
fn test_summary_hides_secrets() {
    let config = BotConfig::from_toml_str(MINIMAL).expect("valid config");
    let summary = config.summary();
    assert!(summary.contains("gemini-2.5-pro"));
    assert!(summary.contains("08:00 UTC"));
    assert!(!summary.contains("test-key"));
    assert!(!summary.contains("123:abc"));
}

#[test]
fn test_metrics_section() {
    let toml = format!(
        "{MINIMAL}\n[metrics]\nexporter = \"otlp\"\notlp_endpoint = \"http://collector:4318/v1/metrics\"\nexport_interval_secs = 15\n"
    );
    let config = BotConfig::from_toml_str(&toml).expect("valid config");

    assert_eq!(*config.metrics().exporter(), MetricsExporter::Otlp);
    assert_eq!(
        config.metrics().otlp_endpoint(),
        "http://collector:4318/v1/metrics"
    );
    assert_eq!(*config.metrics().export_interval_secs(), 15);
    assert!(config.summary().contains("metrics=otlp"));

    let blank_endpoint = format!("{MINIMAL}\n[metrics]\nexporter = \"otlp\"\notlp_endpoint = \"\"\n");
    rejects(&blank_endpoint, "otlp_endpoint");
}

#[test]
fn test_zero_send_timeout_rejected() {
    let toml = MINIMAL.replace("chat_id = \"-100200300\"", "chat_id = \"1\"\nsend_timeout_secs = 0");
    rejects(&toml, "send_timeout_secs");
}
