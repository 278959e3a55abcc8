//! Chat command handling against a mock Bot API.

use async_trait::async_trait;
use chrono::Utc;
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tickerbot_bot::{CommandListener, REPORT_TASK_NAME};
use tickerbot_error::TickerResult;
use tickerbot_interface::{ScheduledTask, TaskOutcome};
use tickerbot_server::{DailySchedule, Scheduler};
use tickerbot_social::{TelegramClient, Update};
use tokio::sync::watch;

#[derive(Default)]
struct CountingTask {
    runs: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl ScheduledTask for CountingTask {
    fn name(&self) -> &str {
        REPORT_TASK_NAME
    }

    async fn run(&self) -> TickerResult<TaskOutcome> {
        tokio::time::sleep(self.delay).await;
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(TaskOutcome::Completed)
    }
}

fn sent_reply() -> serde_json::Value {
    json!({ "ok": true, "result": { "message_id": 1, "chat": { "id": 7 } } })
}

fn update(update_id: i64, chat_id: i64, text: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "chat": { "id": chat_id, "type": "private" },
            "text": text
        }
    }))
    .expect("valid update")
}

fn listener(server: &MockServer, allowed: Vec<i64>) -> (CommandListener, Arc<CountingTask>) {
    listener_with_task(server, allowed, CountingTask::default())
}

fn listener_with_task(
    server: &MockServer,
    allowed: Vec<i64>,
    task: CountingTask,
) -> (CommandListener, Arc<CountingTask>) {
    let client = TelegramClient::with_api_base("t", server.base_url()).expect("client");
    let scheduler = Arc::new(Scheduler::new());
    let task = Arc::new(task);
    scheduler.register(
        DailySchedule::parse("08:00", "UTC").expect("valid"),
        task.clone(),
        Utc::now(),
    );
    (
        CommandListener::new(Arc::new(client), scheduler, allowed, 0),
        task,
    )
}

#[tokio::test]
async fn test_help_lists_commands() {
    let server = MockServer::start();
    let reply = server.mock(|when, then| {
        when.method(POST)
            .path("/bott/sendMessage")
            .body_includes("\"chat_id\":\"7\"")
            .body_includes("/report - generate and send the market report now");
        then.status(200).json_body(sent_reply());
    });
    let (listener, task) = listener(&server, Vec::new());

    let handle = listener.handle_update(&update(1, 7, "/help")).await;

    assert!(handle.is_none());
    reply.assert();
    assert_eq!(task.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_report_command_triggers_task() {
    let server = MockServer::start();
    let started = server.mock(|when, then| {
        when.method(POST)
            .path("/bott/sendMessage")
            .body_includes("Generating the market report");
        then.status(200).json_body(sent_reply());
    });
    let (listener, task) = listener(&server, vec![7]);

    let handle = listener
        .handle_update(&update(2, 7, "/report@TickerBot"))
        .await;
    assert!(handle.is_some());
    listener.wait_for_reports().await;

    started.assert();
    assert_eq!(task.runs.load(Ordering::SeqCst), 1);
    assert_eq!(listener.reports_in_flight(), 0);
}

#[tokio::test]
async fn test_unlisted_chat_is_ignored() {
    let server = MockServer::start();
    let any_reply = server.mock(|when, then| {
        when.method(POST).path("/bott/sendMessage");
        then.status(200).json_body(sent_reply());
    });
    let (listener, task) = listener(&server, vec![7]);

    assert!(listener.handle_update(&update(3, 8, "/report")).await.is_none());
    assert!(listener.handle_update(&update(4, 7, "good morning")).await.is_none());

    assert_eq!(any_reply.calls(), 0);
    assert_eq!(task.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_poll_once_advances_offset() {
    let server = MockServer::start();
    let poll = server.mock(|when, then| {
        when.method(POST)
            .path("/bott/getUpdates")
            .body_includes("\"offset\":10");
        then.status(200).json_body(json!({
            "ok": true,
            "result": [
                { "update_id": 10, "message": { "message_id": 1, "chat": { "id": 7 }, "text": "hi" } },
                { "update_id": 11, "message": { "message_id": 2, "chat": { "id": 7 }, "text": "/help" } }
            ]
        }));
    });
    let help = server.mock(|when, then| {
        when.method(POST).path("/bott/sendMessage");
        then.status(200).json_body(sent_reply());
    });
    let (listener, _task) = listener(&server, Vec::new());

    let next = listener.poll_once(Some(10)).await.expect("poll");

    poll.assert();
    help.assert();
    assert_eq!(next, Some(12));
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/bott/getUpdates");
        then.status(200)
            .delay(Duration::from_millis(20))
            .json_body(json!({ "ok": true, "result": [] }));
    });
    let (listener, _task) = listener(&server, Vec::new());
    let (tx, rx) = watch::channel(false);

    let running = tokio::spawn(async move { listener.run(rx).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(true).expect("listener alive");

    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("listener stops")
        .expect("join");
}

#[tokio::test]
async fn test_shutdown_waits_for_on_demand_report() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/bott/sendMessage");
        then.status(200).json_body(sent_reply());
    });
    server.mock(|when, then| {
        when.method(POST).path("/bott/getUpdates");
        then.status(200)
            .delay(Duration::from_secs(5))
            .json_body(json!({ "ok": true, "result": [] }));
    });
    let slow = CountingTask {
        runs: AtomicUsize::new(0),
        delay: Duration::from_millis(300),
    };
    let (listener, task) = listener_with_task(&server, Vec::new(), slow);

    listener.handle_update(&update(5, 7, "/report")).await;
    assert_eq!(listener.reports_in_flight(), 1);

    let (tx, rx) = watch::channel(false);
    tx.send(true).expect("receiver alive");
    tokio::time::timeout(Duration::from_secs(3), listener.run(rx))
        .await
        .expect("listener stops");

    assert_eq!(task.runs.load(Ordering::SeqCst), 1);
    assert_eq!(listener.reports_in_flight(), 0);
}
