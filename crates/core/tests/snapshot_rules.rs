//! # Snapshot Rules
//!
//! Serialization round-trips and the stale-read acceptance rule.

use stakesync_core::*;

fn sample_pool() -> PoolSnapshot {
    PoolSnapshot {
        rate_bps_per_year: 1_500,
        rate_mode: RateMode::DynamicPool,
        reward_rate_per_second: 31_709,
        lockup_seconds: 604_800,
        pool_duration_seconds: 31_536_000,
        pool_start_time: 1_720_000_000,
        pool_end_time: 1_751_536_000,
        last_update_time: 1_725_000_000,
        total_staked: 123_456_789_000_000_000_000_000,
        token_decimals: 6,
        reward_per_token_accumulated: u128::MAX - 1,
        reflection_per_token_accumulated: 987_654_321,
        reflections_enabled: true,
        reflection_asset_is_native: true,
        reflection_decimals: 9,
        reflection_vault_balance: Some(5_000_000_000),
        reflection_vault_lamports: Some(5_002_039_280),
        last_reflection_balance: 4_000_000_000,
        paused: PauseFlags { deposits: true, withdrawals: false, claims: true, all: false },
        captured_at: 1_725_000_042,
    }
}

fn sample_stake() -> StakeSnapshot {
    StakeSnapshot {
        staked_amount: 42_000_000,
        last_stake_timestamp: 1_724_000_000,
        reward_per_token_paid: 17,
        pending_reward_at_last_checkpoint: 3_000,
        reflection_per_token_paid: 900_000_000,
        pending_reflection_at_last_checkpoint: 12,
        reflection_debt: 4,
        captured_at: 1_725_000_042,
    }
}

#[test]
fn test_pool_snapshot_json_round_trip() {
    let pool = sample_pool();
    let encoded = serde_json::to_string(&pool).unwrap();
    let decoded: PoolSnapshot = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, pool);
}

#[test]
fn test_stake_snapshot_json_round_trip() {
    let stake = sample_stake();
    let encoded = serde_json::to_string(&stake).unwrap();
    let decoded: StakeSnapshot = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, stake);
}

#[test]
fn test_synced_state_round_trip() {
    let state = SyncedState::new(sample_pool(), Some(sample_stake()), 1_725_000_050);
    let encoded = serde_json::to_vec(&state).unwrap();
    let decoded: SyncedState = serde_json::from_slice(&encoded).unwrap();
    assert_eq!(decoded, state);
}

#[test]
fn test_first_snapshot_is_always_accepted() {
    assert!(accept_snapshot(None, &sample_pool()).is_fresh());
}

#[test]
fn test_lower_reward_accumulator_is_stale() {
    let cached = sample_pool();
    let mut fetched = cached.clone();
    fetched.reward_per_token_accumulated -= 1;

    assert_eq!(
        accept_snapshot(Some(&cached), &fetched),
        Acceptance::Stale {
            accumulator: "reward_per_token",
            cached: cached.reward_per_token_accumulated,
            fetched: fetched.reward_per_token_accumulated,
        }
    );
}

#[test]
fn test_lower_reflection_accumulator_is_stale() {
    let cached = sample_pool();
    let mut fetched = cached.clone();
    fetched.reflection_per_token_accumulated = 0;

    assert!(!accept_snapshot(Some(&cached), &fetched).is_fresh());
}

#[test]
fn test_equal_or_higher_accumulators_are_fresh() {
    let cached = sample_pool();
    let mut fetched = cached.clone();
    assert!(accept_snapshot(Some(&cached), &fetched).is_fresh());

    fetched.reward_per_token_accumulated = u128::MAX;
    fetched.reflection_per_token_accumulated += 10;
    fetched.total_staked = 1;
    assert!(accept_snapshot(Some(&cached), &fetched).is_fresh());
}
