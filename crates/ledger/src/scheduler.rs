//! Process-wide pacing of ledger reads.
//!
//! Every read against the provider first takes a [`Permit`]. Permits are
//! granted at least `min_interval` apart no matter how many entities ask
//! concurrently. Slots are reserved on an atomic counter and the caller then
//! sleeps until its slot, so waiting never blocks a runtime thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tracing::trace;

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(2_000);

/// Proof that the caller may issue one ledger read
#[derive(Debug, Clone, Copy)]
pub struct Permit {
    pub granted_at: Instant,
    pub waited: Duration,
    /// 1-based count of permits granted by this scheduler
    pub sequence: u64,
}

#[derive(Debug)]
pub struct RequestScheduler {
    origin: Instant,
    min_interval: Duration,
    /// Next free slot, in nanoseconds since `origin`
    next_free: AtomicU64,
    granted: AtomicU64,
}

impl RequestScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            origin: Instant::now(),
            min_interval,
            next_free: AtomicU64::new(0),
            granted: AtomicU64::new(0),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Number of permits granted so far
    pub fn granted(&self) -> u64 {
        self.granted.load(Ordering::Relaxed)
    }

    /// Wait for the next free slot. Never fails.
    pub async fn acquire(&self) -> Permit {
        let requested = Instant::now();
        let now = as_nanos(requested.saturating_duration_since(self.origin));
        let interval = as_nanos(self.min_interval);

        let mut current = self.next_free.load(Ordering::Acquire);
        let slot = loop {
            let slot = current.max(now);
            match self.next_free.compare_exchange_weak(
                current,
                slot.saturating_add(interval),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break slot,
                Err(actual) => current = actual,
            }
        };

        let granted_at = self.origin + Duration::from_nanos(slot);
        sleep_until(granted_at).await;

        let sequence = self.granted.fetch_add(1, Ordering::Relaxed) + 1;
        let waited = granted_at.saturating_duration_since(requested);
        trace!(sequence, waited_ms = waited.as_millis() as u64, "Granted ledger permit");

        Permit { granted_at, waited, sequence }
    }
}

impl Default for RequestScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

fn as_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
