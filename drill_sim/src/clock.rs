//! Virtual clock for deterministic loop tests.

use async_trait::async_trait;
use drill_env::Clock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Clock whose time only moves when told to.
///
/// - `sleep` advances virtual time instead of waiting
/// - clones share the same time line
pub struct ManualClock {
    /// Virtual time (nanoseconds since the epoch below)
    virtual_time_ns: Arc<AtomicU64>,

    /// Number of `sleep` calls observed
    sleeps: Arc<AtomicUsize>,

    /// Wall-clock time that virtual time 0 maps to
    epoch: SystemTime,
}

impl ManualClock {
    /// Creates a clock starting at 2024-01-01 00:00:00 UTC.
    pub fn new() -> Self {
        Self::starting_at(UNIX_EPOCH + Duration::from_secs(1704067200))
    }

    /// Creates a clock starting at the given wall-clock time.
    pub fn starting_at(epoch: SystemTime) -> Self {
        Self {
            virtual_time_ns: Arc::new(AtomicU64::new(0)),
            sleeps: Arc::new(AtomicUsize::new(0)),
            epoch,
        }
    }

    /// Creates an Arc-wrapped clock for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advances virtual time by the given duration.
    pub fn advance(&self, duration: Duration) {
        self.virtual_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.virtual_time_ns.load(Ordering::SeqCst))
    }

    /// How many times `sleep` has been called.
    pub fn sleep_count(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ManualClock {
    fn clone(&self) -> Self {
        Self {
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            sleeps: Arc::clone(&self.sleeps),
            epoch: self.epoch,
        }
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn system_time(&self) -> SystemTime {
        self.epoch + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.advance(duration);
    }
}
