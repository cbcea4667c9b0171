//! # Accrual Scenarios
//!
//! Worked examples checked against hand-computed on-chain results.

use rust_decimal::Decimal;
use stakesync_core::accrual::*;
use stakesync_core::*;

const SOL: u128 = 1_000_000_000;

fn pool_snapshot() -> PoolSnapshot {
    PoolSnapshot {
        rate_bps_per_year: 0,
        rate_mode: RateMode::FixedApy,
        reward_rate_per_second: 0,
        lockup_seconds: 0,
        pool_duration_seconds: 86_400 * 365,
        pool_start_time: 1_700_000_000,
        pool_end_time: 0,
        last_update_time: 1_700_000_000,
        total_staked: 10_000 * SOL,
        token_decimals: 9,
        reward_per_token_accumulated: 0,
        reflection_per_token_accumulated: 0,
        reflections_enabled: false,
        reflection_asset_is_native: false,
        reflection_decimals: 9,
        reflection_vault_balance: None,
        reflection_vault_lamports: None,
        last_reflection_balance: 0,
        paused: PauseFlags::default(),
        captured_at: 1_700_000_000,
    }
}

fn stake_snapshot(amount: u128) -> StakeSnapshot {
    StakeSnapshot {
        staked_amount: amount,
        last_stake_timestamp: 1_700_000_000,
        reward_per_token_paid: 0,
        pending_reward_at_last_checkpoint: 0,
        reflection_per_token_paid: 0,
        pending_reflection_at_last_checkpoint: 0,
        reflection_debt: 0,
        captured_at: 1_700_000_000,
    }
}

#[test]
fn test_reward_from_accumulator_delta() {
    let mut pool = pool_snapshot();
    pool.reward_per_token_accumulated = 1_000_000;

    let mut stake = stake_snapshot(500 * SOL);
    stake.reward_per_token_paid = 900_000;

    // (100_000 * 500e9) / 1e9
    let reward = accrued_reward(&pool, &stake, pool.last_update_time);
    assert_eq!(reward, 50_000_000);

    let result = accrue(&pool, &stake, pool.last_update_time, DEFAULT_NATIVE_VAULT_BUFFER);
    assert_eq!(result.displayed_reward(), Decimal::new(5, 2));
}

#[test]
fn test_native_reflection_clamped_to_vault() {
    let mut pool = pool_snapshot();
    pool.reflections_enabled = true;
    pool.reflection_asset_is_native = true;
    pool.reflection_vault_balance = Some(8 * SOL);
    pool.reflection_vault_lamports = Some(8 * SOL);
    pool.last_reflection_balance = 8 * SOL;

    let mut stake = stake_snapshot(100 * SOL);
    stake.pending_reflection_at_last_checkpoint = 10 * SOL;

    let reflection = accrued_reflection(&pool, &stake, DEFAULT_NATIVE_VAULT_BUFFER);
    assert_eq!(reflection, 7_997_000_000);

    let result = accrue(&pool, &stake, pool.last_update_time, DEFAULT_NATIVE_VAULT_BUFFER);
    assert_eq!(result.displayed_reflection(), Decimal::new(7997, 3));
}

#[test]
fn test_non_native_reflection_is_not_clamped() {
    let mut pool = pool_snapshot();
    pool.reflections_enabled = true;
    pool.reflection_vault_balance = Some(8 * SOL);
    pool.last_reflection_balance = 8 * SOL;

    let mut stake = stake_snapshot(100 * SOL);
    stake.pending_reflection_at_last_checkpoint = 10 * SOL;

    assert_eq!(accrued_reflection(&pool, &stake, DEFAULT_NATIVE_VAULT_BUFFER), 10 * SOL);
}

#[test]
fn test_dynamic_rate_follows_total_staked() {
    let mut pool = pool_snapshot();
    pool.rate_mode = RateMode::DynamicPool;
    pool.reward_rate_per_second = 100;
    pool.total_staked = 1_000_000_000;

    // (100 * 31_536_000) / 1e9 = 3.1536 per staked unit per year
    assert_eq!(derived_rate_percent(&pool), Decimal::new(31536, 2));

    // Another wallet doubles the pool: the rate halves on the next snapshot
    let mut later = pool.clone();
    later.total_staked = 2_000_000_000;
    assert_eq!(derived_rate_percent(&later), Decimal::new(15768, 2));
}

#[test]
fn test_reward_keeps_accruing_between_snapshots() {
    let mut pool = pool_snapshot();
    // 1 SOL per second across 10_000 staked SOL
    pool.reward_rate_per_second = SOL as u64;
    let stake = stake_snapshot(1_000 * SOL);

    let at_capture = accrued_reward(&pool, &stake, pool.last_update_time);
    let one_minute_later = accrued_reward(&pool, &stake, pool.last_update_time + 60);

    assert_eq!(at_capture, 0);
    // a tenth of the pool earns a tenth of 60 SOL
    assert_eq!(one_minute_later, 6 * SOL);
}

#[test]
fn test_claim_is_not_gated_by_lock() {
    let mut pool = pool_snapshot();
    pool.lockup_seconds = 30 * 86_400;
    pool.reward_per_token_accumulated = SOL;
    let stake = stake_snapshot(10 * SOL);

    let now = stake.last_stake_timestamp + 60;
    let lock = lock_status(&pool, Some(&stake), now);
    assert!(lock.is_locked);
    assert!(accrued_reward(&pool, &stake, now) > 0);
}

#[test]
fn test_view_for_wallet_without_stake() {
    let mut pool = pool_snapshot();
    pool.rate_bps_per_year = 2_500;
    let state = SyncedState::new(pool, None, 1_700_000_100);

    let view = EntityView::derive(&state, 1_700_000_200, DEFAULT_NATIVE_VAULT_BUFFER, false);
    assert_eq!(view.displayed_reward, Decimal::ZERO);
    assert_eq!(view.displayed_reflection, Decimal::ZERO);
    assert_eq!(view.derived_rate_percent, Decimal::new(25, 0));
    assert!(!view.is_locked);
    assert!(!view.pool_has_ended);
    assert_eq!(view.last_reconciled_at, 1_700_000_100);
}

#[test]
fn test_view_reports_pool_end_and_lock() {
    let mut pool = pool_snapshot();
    pool.lockup_seconds = 1_000;
    pool.pool_duration_seconds = 500;
    let stake = stake_snapshot(SOL);
    let state = SyncedState::new(pool, Some(stake), 1_700_000_000);

    let view = EntityView::derive(&state, 1_700_000_600, DEFAULT_NATIVE_VAULT_BUFFER, true);
    assert!(view.pool_has_ended);
    assert!(view.is_locked);
    assert_eq!(view.unlock_in_seconds, 400);
    assert_eq!(view.staked_amount, Decimal::ONE);
    assert!(view.last_fetch_failed);
}
