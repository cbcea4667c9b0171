//! # Accrual Engine
//!
//! Pure, deterministic reproduction of the staking program's pull-based
//! accounting. Given the last snapshots and a wall-clock timestamp it yields
//! the reward and reflection amounts a claim would currently pay, without any
//! I/O.
//!
//! Both schedules follow the same pattern: a pool-wide per-token accumulator
//! (scaled by [`SCALE`]) grows over time; a stake's pending amount is the
//! value checkpointed at its last interaction plus
//! `(accumulator - paid) * staked / SCALE`.
//!
//! Between snapshots the reward accumulator is extrapolated from the pool's
//! emission rate (capped at the pool end), and the reflection accumulator from
//! vault tokens that arrived but have not been folded in yet.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{SCALE, SECONDS_PER_YEAR};
use crate::math::mul_div_saturating;
use crate::types::{PoolSnapshot, RateMode, StakeSnapshot, UnixTimestamp};

/// Amounts a claim would pay at one instant, in base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualResult {
    pub reward: u128,
    pub reflection: u128,
    pub token_decimals: u8,
    pub reflection_decimals: u8,
}

impl AccrualResult {
    pub fn displayed_reward(&self) -> Decimal {
        to_decimal(self.reward, self.token_decimals)
    }

    pub fn displayed_reflection(&self) -> Decimal {
        to_decimal(self.reflection, self.reflection_decimals)
    }
}

/// Lock state of a stake's principal. Claims are never gated by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    pub is_locked: bool,
    pub unlock_in_seconds: u64,
    pub lock_expiry: Option<UnixTimestamp>,
}

/// Reward accumulator extrapolated to `now`.
///
/// Accrual stops at the pool end time. With `now <= last_update_time` the
/// stored accumulator is returned unchanged.
pub fn projected_reward_per_token(pool: &PoolSnapshot, now: UnixTimestamp) -> u128 {
    let stored = pool.reward_per_token_accumulated;
    if pool.total_staked == 0 || pool.reward_rate_per_second == 0 {
        return stored;
    }

    let end = pool.pool_end_time();
    let effective_now = if end > 0 { now.min(end) } else { now };
    let elapsed = effective_now.saturating_sub(pool.last_update_time);
    if elapsed <= 0 {
        return stored;
    }

    let emitted = u128::from(pool.reward_rate_per_second) * elapsed as u128;
    stored.saturating_add(mul_div_saturating(emitted, SCALE, pool.total_staked))
}

/// Reflection accumulator including vault tokens the program has not folded
/// in yet.
///
/// Mirrors the program's refresh rule: only a vault balance above the last
/// processed balance counts, and nothing is distributed while nobody stakes.
pub fn projected_reflection_per_token(pool: &PoolSnapshot) -> u128 {
    let stored = pool.reflection_per_token_accumulated;
    if !pool.reflections_enabled || pool.total_staked == 0 {
        return stored;
    }
    match pool.reflection_vault_balance {
        Some(balance) if balance > pool.last_reflection_balance => {
            let arrived = balance - pool.last_reflection_balance;
            stored.saturating_add(mul_div_saturating(arrived, SCALE, pool.total_staked))
        }
        _ => stored,
    }
}

/// Reward claimable at `now`
pub fn accrued_reward(pool: &PoolSnapshot, stake: &StakeSnapshot, now: UnixTimestamp) -> u128 {
    let pending = stake.pending_reward_at_last_checkpoint;
    if stake.staked_amount == 0 {
        return pending;
    }
    let rate_diff = projected_reward_per_token(pool, now).saturating_sub(stake.reward_per_token_paid);
    pending.saturating_add(mul_div_saturating(rate_diff, stake.staked_amount, SCALE))
}

/// Reflection claimable now, before the native-vault clamp
pub fn unclamped_reflection(pool: &PoolSnapshot, stake: &StakeSnapshot) -> u128 {
    if !pool.reflections_enabled {
        return 0;
    }
    let pending = stake.pending_reflection_at_last_checkpoint;
    if stake.staked_amount == 0 {
        return pending;
    }
    let rate_diff = projected_reflection_per_token(pool).saturating_sub(stake.reflection_per_token_paid);
    let earned = mul_div_saturating(rate_diff, stake.staked_amount, SCALE);
    pending.saturating_add(earned.saturating_sub(stake.reflection_debt))
}

/// Reflection claimable now.
///
/// A native-asset vault can hold less than what stakers are owed; the amount
/// shown never exceeds the vault's lamports above `native_buffer`.
pub fn accrued_reflection(pool: &PoolSnapshot, stake: &StakeSnapshot, native_buffer: u128) -> u128 {
    let owed = unclamped_reflection(pool, stake);
    match (pool.reflection_asset_is_native, pool.reflection_vault_lamports) {
        (true, Some(lamports)) => clamp_to_vault(owed, lamports, native_buffer),
        _ => owed,
    }
}

/// `min(owed, balance - buffer)`, floored at zero
pub fn clamp_to_vault(owed: u128, vault_balance: u128, buffer: u128) -> u128 {
    owed.min(vault_balance.saturating_sub(buffer))
}

/// Both accruals for one stake at `now`
pub fn accrue(
    pool: &PoolSnapshot,
    stake: &StakeSnapshot,
    now: UnixTimestamp,
    native_buffer: u128,
) -> AccrualResult {
    AccrualResult {
        reward: accrued_reward(pool, stake, now),
        reflection: accrued_reflection(pool, stake, native_buffer),
        token_decimals: pool.token_decimals,
        reflection_decimals: pool.reflection_decimals,
    }
}

/// Annual rate shown for the pool, in percent.
///
/// Dynamic pools depend on `total_staked`, so this must be re-derived from
/// every new snapshot rather than cached.
pub fn derived_rate_percent(pool: &PoolSnapshot) -> Decimal {
    match pool.rate_mode {
        RateMode::FixedApy => Decimal::from(pool.rate_bps_per_year) / Decimal::ONE_HUNDRED,
        RateMode::DynamicPool => {
            if pool.total_staked == 0 {
                return Decimal::ZERO;
            }
            let annual = u128::from(pool.reward_rate_per_second) * u128::from(SECONDS_PER_YEAR);
            to_decimal(annual, 0)
                .checked_mul(Decimal::ONE_HUNDRED)
                .and_then(|scaled| scaled.checked_div(to_decimal(pool.total_staked, 0)))
                .unwrap_or(Decimal::ZERO)
        }
    }
}

/// Principal lock state at `now`
pub fn lock_status(pool: &PoolSnapshot, stake: Option<&StakeSnapshot>, now: UnixTimestamp) -> LockStatus {
    let stake = match stake {
        Some(stake) if stake.has_stake() && pool.lockup_seconds > 0 => stake,
        _ => {
            return LockStatus { is_locked: false, unlock_in_seconds: 0, lock_expiry: None };
        }
    };
    let expiry = stake.lock_expiry(pool.lockup_seconds);
    let remaining = expiry.saturating_sub(now).max(0) as u64;
    LockStatus {
        is_locked: remaining > 0,
        unlock_in_seconds: remaining,
        lock_expiry: Some(expiry),
    }
}

/// Base units to a decimal amount with `decimals` fractional digits
pub fn to_decimal(amount: u128, decimals: u8) -> Decimal {
    // Decimal carries at most 28 fractional digits
    let mut amount = amount;
    let mut scale = u32::from(decimals);
    while scale > 28 {
        amount /= 10;
        scale -= 1;
    }
    i128::try_from(amount)
        .ok()
        .and_then(|value| Decimal::try_from_i128_with_scale(value, scale).ok())
        .unwrap_or(Decimal::MAX)
}
