//! Timing policies for reconciliation and mutations.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::Rng;
use stakesync_core::DEFAULT_NATIVE_VAULT_BUFFER;
use tokio::time::Instant;

/// Uniformly jittered delay between periodic reconciliations, so entities
/// watched together drift apart instead of hitting the provider in bursts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterPolicy {
    pub min: Duration,
    pub max: Duration,
}

impl JitterPolicy {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn next_delay(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if max <= min {
            return self.min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for JitterPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(120), Duration::from_secs(150))
    }
}

/// Minimum spacing between two user-initiated operations
#[derive(Debug)]
pub struct Cooldown {
    period: Duration,
    last: Mutex<Option<Instant>>,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self { period, last: Mutex::new(None) }
    }

    /// Time left before the next start is allowed
    pub fn remaining(&self) -> Option<Duration> {
        let last = *self.last.lock().unwrap_or_else(PoisonError::into_inner);
        last.and_then(|at| self.period.checked_sub(at.elapsed()))
            .filter(|left| !left.is_zero())
    }

    /// Claims the slot, or reports how long to wait
    pub fn try_start(&self) -> Result<(), Duration> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(left) = last.and_then(|at| self.period.checked_sub(at.elapsed())) {
            if !left.is_zero() {
                return Err(left);
            }
        }
        *last = Some(Instant::now());
        Ok(())
    }

    /// Starts a new period now, whatever is left of the current one
    pub fn restart(&self) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }
}

/// Settings of one entity's reconciliation loop
#[derive(Debug, Clone, Copy)]
pub struct ReconcilePolicy {
    pub jitter: JitterPolicy,
    pub manual_refresh_cooldown: Duration,
    pub tick_interval: Duration,
    /// Lamports kept out of native reflection payouts
    pub native_vault_buffer: u128,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            jitter: JitterPolicy::default(),
            manual_refresh_cooldown: Duration::from_millis(3_000),
            tick_interval: Duration::from_secs(10),
            native_vault_buffer: DEFAULT_NATIVE_VAULT_BUFFER,
        }
    }
}
