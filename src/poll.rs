//! Bounded polling
//!
//! Fixed-interval wait on an external condition: a predicate checked up to a
//! tick ceiling. The one asynchronous process this tool depends on (md array
//! resync) is owned by the kernel, so waiting on it is a poll, not a
//! coordination primitive.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Result of a bounded poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Predicate turned true on this check (1-based)
    Settled { ticks: u32 },
    /// Ceiling reached with the predicate still false
    TimedOut,
}

/// Check `predicate` up to `max_ticks` times, sleeping `interval` between
/// checks. The first check happens immediately. Predicate errors propagate.
pub async fn poll_until<F, Fut>(
    interval: Duration,
    max_ticks: u32,
    mut predicate: F,
) -> Result<PollOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for tick in 1..=max_ticks {
        if predicate().await? {
            return Ok(PollOutcome::Settled { ticks: tick });
        }
        if tick < max_ticks {
            sleep(interval).await;
        }
    }
    Ok(PollOutcome::TimedOut)
}
