//! Trait definitions for the tickerbot report pipeline.
//!
//! The traits sit at the seams between the core pipeline and its external
//! collaborators:
//! - [`TextGenerator`] - one call to a generative-text backend
//! - [`Messenger`] - outbound chat transport
//! - [`QuoteSource`] - market data supplier
//! - [`ScheduledTask`] - a unit of work the scheduler can trigger

#![warn(missing_docs)]

mod generator;
mod market;
mod messenger;
mod task;

pub use generator::TextGenerator;
pub use market::{Quote, QuoteSource};
pub use messenger::{Messenger, SentMessage};
pub use task::{ScheduledTask, TaskOutcome};
