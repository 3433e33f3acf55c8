use chrono::Utc;
use std::time::Duration;
use tokio::time::Instant;

/// Millisecond clock anchored to the tokio runtime's notion of time.
///
/// The current epoch millisecond is derived from a wall-clock reading captured
/// at construction plus runtime time elapsed since, so the ingestion cutoff
/// and the expiry timers always observe the same time source. Under a paused
/// test runtime, [`tokio::time::advance`] moves both in lockstep.
#[derive(Debug, Clone, Copy)]
pub struct WindowClock {
    anchor_epoch_ms: i64,
    anchor_instant: Instant,
}

impl WindowClock {
    /// Clock anchored at the current wall-clock time.
    pub fn new() -> Self {
        Self::anchored_at(Utc::now().timestamp_millis())
    }

    /// Clock that reads `epoch_ms` now, advancing with runtime time from here.
    ///
    /// Lets tests and simulations pin the epoch base deterministically.
    pub fn anchored_at(epoch_ms: i64) -> Self {
        Self {
            anchor_epoch_ms: epoch_ms,
            anchor_instant: Instant::now(),
        }
    }

    /// Current time in epoch milliseconds.
    pub fn now_ms(&self) -> i64 {
        self.anchor_epoch_ms + self.anchor_instant.elapsed().as_millis() as i64
    }

    /// Convert an epoch millisecond instant into a runtime sleep deadline.
    ///
    /// Instants at or before the anchor map to the anchor itself, so a sleep
    /// until an already-passed deadline completes immediately.
    pub fn deadline_for(&self, epoch_ms: i64) -> Instant {
        match u64::try_from(epoch_ms - self.anchor_epoch_ms) {
            Ok(offset_ms) => self.anchor_instant + Duration::from_millis(offset_ms),
            Err(_) => self.anchor_instant,
        }
    }
}

impl Default for WindowClock {
    fn default() -> Self {
        Self::new()
    }
}
