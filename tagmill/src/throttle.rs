//! Per-stream call pacing
//!
//! Each concurrent stream owns one [`Throttle`]; together the streams
//! approximate per-endpoint rate limits without any shared clock. The check
//! is against a monotonic timestamp of the previous call start, so a call
//! that was already slower than the interval costs no extra wait.

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Enforces a minimum gap between consecutive call starts on one stream
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_call: Option<Instant>,
}

impl Throttle {
    /// Create a throttle with the given minimum inter-call interval
    ///
    /// The first call after construction proceeds without delay.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Suspend until at least `interval` has passed since this stream's
    /// previous call start, then mark the start of the next call
    pub async fn pace(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                let wait = self.interval - elapsed;
                trace!(?wait, "pace: waiting out the interval");
                tokio::time::sleep(wait).await;
            }
        }
        self.last_call = Some(Instant::now());
    }
}
