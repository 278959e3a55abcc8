//! Backoff and pacing primitives for tickerbot.
//!
//! [`BackoffPolicy`] schedules the waits between generation attempts and
//! [`SendPacer`] spaces outbound chat messages.

#![warn(missing_docs)]

mod backoff;
mod error;
mod limiter;

pub use backoff::{BackoffPolicy, MAX_BACKOFF_EXPONENT};
pub use error::{RateLimitError, RateLimitErrorKind};
pub use limiter::SendPacer;
