//! Scheduled task trait.

use async_trait::async_trait;
use tickerbot_error::TickerResult;

/// What a task run amounted to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskOutcome {
    /// The task ran to completion.
    Completed,
    /// The task declined to run, e.g. because a run was already in flight.
    Skipped(String),
}

/// A unit of work the scheduler or a chat command can trigger.
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    /// Stable task name, used for logging and lookups.
    fn name(&self) -> &str;

    /// Run the task once.
    ///
    /// # Errors
    ///
    /// Returns error if the run failed; the caller logs it and keeps going.
    async fn run(&self) -> TickerResult<TaskOutcome>;
}
