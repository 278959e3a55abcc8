//! Scheduler firing, triggering and shutdown.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tickerbot_error::TickerResult;
use tickerbot_interface::{ScheduledTask, TaskOutcome};
use tickerbot_server::{DailySchedule, Scheduler};
use tokio::sync::watch;

#[derive(Default)]
struct CountingTask {
    runs: AtomicUsize,
}

impl CountingTask {
    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScheduledTask for CountingTask {
    fn name(&self) -> &str {
        "daily_report"
    }

    async fn run(&self) -> TickerResult<TaskOutcome> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(TaskOutcome::Completed)
    }
}

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, h, m, s)
        .single()
        .expect("valid instant")
}

#[tokio::test]
async fn test_daily_task_fires_once_when_due() {
    let scheduler = Scheduler::new();
    let task = Arc::new(CountingTask::default());
    scheduler.register(
        DailySchedule::parse("08:00", "UTC").expect("valid"),
        task.clone(),
        at(7, 0, 0),
    );

    assert_eq!(scheduler.tick(at(7, 59, 59)).await, 0);
    assert_eq!(scheduler.tick(at(8, 0, 0)).await, 1);
    assert_eq!(scheduler.tick(at(8, 0, 1)).await, 0);
    assert_eq!(scheduler.tick(at(12, 0, 0)).await, 0);
    assert_eq!(task.runs(), 1);

    let status = scheduler.status();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].name(), "daily_report");
    assert_eq!(*status[0].last_run(), Some(at(8, 0, 0)));
    assert_eq!(
        *status[0].next_run(),
        Some(
            Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0)
                .single()
                .expect("valid")
        )
    );
}

#[tokio::test]
async fn test_registration_after_daily_time_waits_for_tomorrow() {
    let scheduler = Scheduler::new();
    let task = Arc::new(CountingTask::default());
    scheduler.register(
        DailySchedule::parse("08:00", "UTC").expect("valid"),
        task.clone(),
        at(9, 0, 0),
    );

    assert_eq!(scheduler.tick(at(9, 0, 1)).await, 0);
    assert_eq!(task.runs(), 0);
}

#[tokio::test]
async fn test_trigger_runs_named_task_without_touching_schedule() {
    let scheduler = Scheduler::new();
    let task = Arc::new(CountingTask::default());
    scheduler.register(
        DailySchedule::parse("08:00", "UTC").expect("valid"),
        task.clone(),
        at(7, 0, 0),
    );
    let before = scheduler.status();

    let result = scheduler.trigger("daily_report").await;

    assert!(matches!(result, Some(Ok(TaskOutcome::Completed))));
    assert_eq!(task.runs(), 1);
    assert_eq!(scheduler.status(), before);
    assert!(scheduler.trigger("unknown").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_stops_on_shutdown() {
    let scheduler = Arc::new(Scheduler::new());
    let task = Arc::new(CountingTask::default());
    scheduler.register(
        DailySchedule::parse("08:00", "UTC").expect("valid"),
        task.clone(),
        Utc::now() + chrono::Duration::hours(1),
    );
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run(Duration::from_secs(1), rx).await }
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    tx.send(true).expect("scheduler listening");
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop exits")
        .expect("loop did not panic");

    assert_eq!(task.runs(), 0);
}
