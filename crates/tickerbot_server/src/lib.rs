//! Scheduling for the tickerbot report pipeline.
//!
//! [`DailySchedule`] computes the next wall-clock run in a timezone and
//! [`Scheduler`] owns the registered tasks and fires them when due.

#![warn(missing_docs)]

mod schedule;
mod scheduler;

pub use schedule::{DailySchedule, Schedule, parse_report_time, parse_timezone};
pub use scheduler::{EntryStatus, Scheduler};
