//! Read model handed to UI callers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accrual::{accrue, derived_rate_percent, lock_status, to_decimal};
use crate::reconcile::SyncedState;
use crate::types::{PauseFlags, UnixTimestamp};

/// Everything a pool widget renders, derived from the cached snapshots at one
/// instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityView {
    pub displayed_reward: Decimal,
    pub displayed_reflection: Decimal,
    pub derived_rate_percent: Decimal,
    pub staked_amount: Decimal,
    pub is_locked: bool,
    pub unlock_in_seconds: u64,
    pub pool_has_ended: bool,
    pub is_paused: PauseFlags,
    pub last_reconciled_at: UnixTimestamp,
    /// The most recent fetch failed and the values come from an older snapshot
    pub last_fetch_failed: bool,
}

impl EntityView {
    pub fn derive(
        state: &SyncedState,
        now: UnixTimestamp,
        native_buffer: u128,
        last_fetch_failed: bool,
    ) -> Self {
        let pool = state.pool.as_ref();
        let stake = state.stake.as_deref();

        let (displayed_reward, displayed_reflection, staked_amount) = match stake {
            Some(stake) => {
                let accrual = accrue(pool, stake, now, native_buffer);
                (
                    accrual.displayed_reward(),
                    accrual.displayed_reflection(),
                    to_decimal(stake.staked_amount, pool.token_decimals),
                )
            }
            None => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        };

        let lock = lock_status(pool, stake, now);

        Self {
            displayed_reward,
            displayed_reflection,
            derived_rate_percent: derived_rate_percent(pool),
            staked_amount,
            is_locked: lock.is_locked,
            unlock_in_seconds: lock.unlock_in_seconds,
            pool_has_ended: pool.has_ended_at(now),
            is_paused: pool.paused,
            last_reconciled_at: state.reconciled_at,
            last_fetch_failed,
        }
    }
}
