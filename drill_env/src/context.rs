//! Clock abstraction used by the playlist loop.

use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The loop's view of real time.
///
/// Grading never uses this; graders read simulated time from snapshots.
/// The execution loop uses it to derive fresh seeds and to back off
/// between failed playlist loads.
///
/// # Implementations
///
/// - **Production**: `SystemClock` - wraps `SystemTime::now` and `tokio::time::sleep`
/// - **Tests**: `ManualClock` (drill_sim) - a virtual clock advanced by `sleep`
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// Returns the current wall-clock time.
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In tests: advances virtual time
    async fn sleep(&self, duration: Duration);

    /// Milliseconds since the unix epoch, saturating at zero for clocks
    /// set before 1970.
    fn epoch_millis(&self) -> u64 {
        self.system_time()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
