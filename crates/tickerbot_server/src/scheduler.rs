//! The scheduler object shared by the polling loop and chat commands.

use crate::{DailySchedule, Schedule};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tickerbot_error::TickerResult;
use tickerbot_interface::{ScheduledTask, TaskOutcome};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// One registered task and its timing state.
struct Entry {
    schedule: DailySchedule,
    task: Arc<dyn ScheduledTask>,
    next_run: Option<DateTime<Utc>>,
    last_run: Option<DateTime<Utc>>,
}

/// Snapshot of an entry, for logging and status replies.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct EntryStatus {
    /// Task name
    name: String,
    /// Schedule description
    schedule: String,
    /// Next planned run
    next_run: Option<DateTime<Utc>>,
    /// Last time the scheduler started the task
    last_run: Option<DateTime<Utc>>,
}

/// Owns (schedule, task) entries and fires them when due.
///
/// Built once at startup and shared through an `Arc` by the polling loop and
/// the command listener. Timing state sits behind a mutex that is never held
/// across a task run.
#[derive(Default)]
pub struct Scheduler {
    entries: Mutex<Vec<Entry>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task; its first run is the schedule's next execution after `now`.
    pub fn register(
        &self,
        schedule: DailySchedule,
        task: Arc<dyn ScheduledTask>,
        now: DateTime<Utc>,
    ) {
        let next_run = schedule.next_execution(now);
        info!(
            task = task.name(),
            schedule = %schedule,
            next_run = ?next_run,
            "Registered scheduled task"
        );
        self.entries.lock().push(Entry {
            schedule,
            task,
            next_run,
            last_run: None,
        });
    }

    /// Current state of every entry.
    pub fn status(&self) -> Vec<EntryStatus> {
        self.entries
            .lock()
            .iter()
            .map(|entry| EntryStatus {
                name: entry.task.name().to_string(),
                schedule: entry.schedule.to_string(),
                next_run: entry.next_run,
                last_run: entry.last_run,
            })
            .collect()
    }

    /// Claim every task due at `now` and advance its next run.
    fn take_due(&self, now: DateTime<Utc>) -> Vec<Arc<dyn ScheduledTask>> {
        let mut entries = self.entries.lock();
        entries
            .iter_mut()
            .filter(|entry| entry.next_run.is_some_and(|next| next <= now))
            .map(|entry| {
                entry.last_run = Some(now);
                entry.next_run = entry.schedule.next_execution(now);
                debug!(task = entry.task.name(), next_run = ?entry.next_run, "Task due");
                entry.task.clone()
            })
            .collect()
    }

    /// Run every task that is due at `now`, one after another.
    ///
    /// Returns the number of tasks started. Task failures are logged.
    #[instrument(skip(self))]
    pub async fn tick(&self, now: DateTime<Utc>) -> usize {
        let due = self.take_due(now);
        for task in &due {
            info!(task = task.name(), "Executing scheduled task");
            log_outcome(task.name(), task.run().await);
        }
        due.len()
    }

    /// Run a task by name right away, outside its schedule.
    ///
    /// Returns `None` if no task has that name. The schedule is untouched.
    #[instrument(skip(self))]
    pub async fn trigger(&self, name: &str) -> Option<TickerResult<TaskOutcome>> {
        let task = self
            .entries
            .lock()
            .iter()
            .find(|entry| entry.task.name() == name)
            .map(|entry| entry.task.clone());

        let Some(task) = task else {
            warn!(task = name, "Trigger for unknown task");
            return None;
        };

        info!(task = name, "Executing triggered task");
        Some(task.run().await)
    }

    /// Poll every `poll_interval` until `shutdown` flips to true.
    pub async fn run(&self, poll_interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            poll_ms = u64::try_from(poll_interval.as_millis()).unwrap_or(u64::MAX),
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Utc::now()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received, stopping scheduler");
                        break;
                    }
                }
            }
        }
    }
}

fn log_outcome(name: &str, result: TickerResult<TaskOutcome>) {
    match result {
        Ok(TaskOutcome::Completed) => info!(task = name, "Task completed"),
        Ok(TaskOutcome::Skipped(reason)) => warn!(task = name, %reason, "Task skipped"),
        Err(e) => error!(task = name, error = %e, "Task failed"),
    }
}
