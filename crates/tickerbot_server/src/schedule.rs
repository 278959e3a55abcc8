//! Task scheduling abstractions.
//!
//! Schedules only answer one question: given a reference instant, when is
//! the next run? The [`Scheduler`](crate::Scheduler) keeps the state.

use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tickerbot_error::ConfigError;

/// Trait for schedule types that can determine when tasks should run.
pub trait Schedule {
    /// Calculate the next execution time strictly after a reference time.
    ///
    /// # Returns
    ///
    /// Next execution time, or None if schedule is exhausted
    fn next_execution(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// Parse a wall-clock time in `HH:MM` form.
///
/// # Errors
///
/// Returns an error unless the input is a valid 24-hour `HH:MM` time.
///
/// # Examples
///
/// ```
/// use chrono::NaiveTime;
/// use tickerbot_server::parse_report_time;
///
/// assert_eq!(
///     parse_report_time("08:30").unwrap(),
///     NaiveTime::from_hms_opt(8, 30, 0).unwrap()
/// );
/// assert!(parse_report_time("25:00").is_err());
/// assert!(parse_report_time("8am").is_err());
/// ```
pub fn parse_report_time(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
        ConfigError::new(format!(
            "report time '{value}' is not a valid HH:MM time: {e}"
        ))
    })
}

/// Parse an IANA timezone name such as `Asia/Shanghai`.
///
/// # Errors
///
/// Returns an error if the name is not in the timezone database.
pub fn parse_timezone(value: &str) -> Result<Tz, ConfigError> {
    Tz::from_str(value.trim())
        .map_err(|e| ConfigError::new(format!("unknown timezone '{value}': {e}")))
}

/// Once a day at a wall-clock time in a timezone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Getters)]
pub struct DailySchedule {
    /// Local time of day
    at: NaiveTime,
    /// Timezone the time is interpreted in
    timezone: Tz,
}

impl DailySchedule {
    /// Creates a schedule from an already parsed time and timezone.
    pub fn new(at: NaiveTime, timezone: Tz) -> Self {
        Self { at, timezone }
    }

    /// Daily schedule from configuration strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the time or timezone does not parse.
    pub fn parse(report_time: &str, timezone: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(
            parse_report_time(report_time)?,
            parse_timezone(timezone)?,
        ))
    }
}

impl std::fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "daily at {} {}", self.at.format("%H:%M"), self.timezone)
    }
}

/// Resolve a local date and time to an instant.
///
/// Ambiguous times (clocks going back) take the earlier instant; times that
/// fall in a gap (clocks going forward) are pushed past the gap.
fn resolve_local(timezone: &Tz, date: NaiveDate, at: NaiveTime) -> Option<DateTime<Utc>> {
    let naive = date.and_time(at);
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => timezone
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|t| t.with_timezone(&Utc)),
    }
}

impl Schedule for DailySchedule {
    fn next_execution(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = after.with_timezone(&self.timezone).date_naive();
        (0..=2u64)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .filter_map(|date| resolve_local(&self.timezone, date, self.at))
            .find(|candidate| *candidate > after)
    }
}
