//! Time source for the orchestrators.
//!
//! Every artificial delay and every `last_check` timestamp goes through a
//! [`Clock`], so tests can run the monitor on a paused tokio runtime and
//! advance virtual time instead of sleeping for real.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

#[async_trait]
pub trait Clock {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Clock driven by the tokio timer.
///
/// Wall-clock time is captured once at construction and advanced by
/// tokio's monotonic [`Instant`]. Under `tokio::time::pause()` both the
/// timestamps and the sleeps follow virtual time.
#[derive(Debug, Clone)]
pub struct TokioClock {
    anchor_wall: DateTime<Utc>,
    anchor_instant: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Clock whose `now()` starts at `anchor_wall`.
    pub fn anchored_at(anchor_wall: DateTime<Utc>) -> Self {
        Self {
            anchor_wall,
            anchor_instant: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.anchor_instant.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.anchor_wall + elapsed
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
