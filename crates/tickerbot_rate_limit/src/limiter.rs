//! Outbound pacing using governor.
//!
//! The GCRA limiter spaces consecutive sends so a burst of chunks does not
//! trip the chat transport's flood control.

use crate::{RateLimitError, RateLimitErrorKind};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Paces outbound sends to a fixed rate.
///
/// Cloning shares the underlying quota, so every clone draws from the same
/// budget.
///
/// # Example
///
/// ```rust,ignore
/// let pacer = SendPacer::per_second(1)?;
/// for chunk in chunks {
///     pacer.acquire().await;
///     messenger.send_message(chat_id, chunk.text(), mode).await?;
/// }
/// ```
#[derive(Clone, Default)]
pub struct SendPacer {
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl std::fmt::Debug for SendPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendPacer")
            .field("limited", &self.is_limited())
            .finish()
    }
}

impl SendPacer {
    /// Pacer allowing `sends` sends per second.
    ///
    /// # Errors
    ///
    /// Returns an error if `sends` is zero.
    pub fn per_second(sends: u32) -> Result<Self, RateLimitError> {
        let n = NonZeroU32::new(sends).ok_or_else(|| {
            RateLimitError::new(RateLimitErrorKind::InvalidQuota(
                "sends per second must be greater than zero".to_string(),
            ))
        })?;
        Ok(Self::from_quota(Quota::per_second(n)))
    }

    /// Pacer allowing `sends` sends per minute.
    ///
    /// # Errors
    ///
    /// Returns an error if `sends` is zero.
    pub fn per_minute(sends: u32) -> Result<Self, RateLimitError> {
        let n = NonZeroU32::new(sends).ok_or_else(|| {
            RateLimitError::new(RateLimitErrorKind::InvalidQuota(
                "sends per minute must be greater than zero".to_string(),
            ))
        })?;
        Ok(Self::from_quota(Quota::per_minute(n)))
    }

    /// Pacer that never waits.
    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    fn from_quota(quota: Quota) -> Self {
        Self {
            limiter: Some(Arc::new(GovernorRateLimiter::direct(quota))),
        }
    }

    /// Whether this pacer enforces any limit.
    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait until the next send is allowed.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Claim a send slot without waiting.
    ///
    /// Returns false if the quota is exhausted right now.
    pub fn try_acquire(&self) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check().is_ok(),
            None => true,
        }
    }
}
