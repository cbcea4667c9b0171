//! Reconciliation loop behavior against the in-memory ledger.

mod common;

use std::time::Duration;

use common::{Harness, SOL};
use rust_decimal::Decimal;
use stakesync::ReconcilePhase;
use stakesync_core::{FetchError, MutationError};
use tokio::time::{sleep, Instant};

#[tokio::test(start_paused = true)]
async fn first_fetch_populates_state_and_view() {
    let h = Harness::new();
    let handle = h.spawn();

    let status = handle.wait_for_fetches(1).await;
    let state = status.state.expect("state after first fetch");
    assert_eq!(state.pool.total_staked, 10 * SOL as u128);
    assert_eq!(state.stake.as_ref().unwrap().staked_amount, SOL as u128);
    assert!(status.last_error.is_none());
    assert_eq!(status.phase, ReconcilePhase::Idle);

    let mut views = handle.subscribe_view();
    let view = views.wait_for(|v| v.is_some()).await.unwrap().clone().unwrap();
    assert_eq!(view.displayed_reward, Decimal::new(5, 3));
    // The vault's rent reserve is not a reflection
    assert_eq!(view.displayed_reflection, Decimal::ZERO);
    assert_eq!(view.staked_amount, Decimal::ONE);
    assert_eq!(view.derived_rate_percent, Decimal::new(12, 0));
    assert!(!view.is_locked);
    assert!(!view.last_fetch_failed);
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_keeps_last_good_state() {
    let h = Harness::new();
    let handle = h.spawn();
    let before = handle.wait_for_fetches(1).await.state;

    h.ledger.fail_reads(true);
    handle.refresh().unwrap();
    let status = handle.wait_for_fetches(2).await;

    assert_eq!(status.state, before);
    assert!(matches!(status.last_error, Some(FetchError::Transient(_))));

    let mut views = handle.subscribe_view();
    let view = views
        .wait_for(|v| v.as_ref().is_some_and(|v| v.last_fetch_failed))
        .await
        .unwrap()
        .clone()
        .unwrap();
    assert_eq!(view.staked_amount, Decimal::ONE);
}

#[tokio::test(start_paused = true)]
async fn stale_snapshot_is_discarded() {
    let h = Harness::new();
    let handle = h.spawn();
    handle.wait_for_fetches(1).await;

    // A lagging node reports an older reward accumulator
    h.set_accumulators(4_000_000, 0);
    handle.refresh().unwrap();
    let status = handle.wait_for_fetches(2).await;

    assert_eq!(status.stale_discards, 1);
    assert!(status.last_error.is_none());
    assert_eq!(status.state.unwrap().pool.reward_per_token_accumulated, 5_000_000);

    sleep(Duration::from_secs(3)).await;
    h.set_accumulators(6_000_000, 10);
    handle.refresh().unwrap();
    let status = handle.wait_for_fetches(3).await;

    let pool = status.state.unwrap().pool;
    assert_eq!(pool.reward_per_token_accumulated, 6_000_000);
    assert_eq!(pool.reflection_per_token_accumulated, 10);
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_has_cooldown() {
    let h = Harness::new();
    let handle = h.spawn();
    handle.wait_for_fetches(1).await;

    assert!(handle.refresh().is_ok());
    assert_eq!(handle.refresh(), Err(MutationError::CooldownActive { retry_in_ms: 3_000 }));

    sleep(Duration::from_secs(3)).await;
    assert!(handle.refresh().is_ok());
}

#[tokio::test(start_paused = true)]
async fn triggers_during_a_fetch_coalesce() {
    let h = Harness::new();
    let handle = h.spawn();

    let mut status = handle.subscribe();
    status.wait_for(|s| s.phase == ReconcilePhase::Fetching).await.unwrap();
    handle.request_reconcile();
    handle.request_reconcile();
    handle.request_reconcile();

    handle.wait_for_fetches(2).await;
    sleep(Duration::from_secs(60)).await;

    assert_eq!(handle.status().fetches, 2);
    // 4 reads for the first fetch, 3 once the mint is cached
    assert_eq!(h.ledger.read_count(), 7);
}

#[tokio::test(start_paused = true)]
async fn periodic_reconciliation_is_jittered() {
    let h = Harness::new();
    let start = Instant::now();
    let handle = h.spawn();

    handle.wait_for_fetches(2).await;
    let elapsed = start.elapsed();

    // first fetch ends at 6s, the next starts 120-150s later and takes 4s
    assert!(elapsed >= Duration::from_secs(130), "{:?}", elapsed);
    assert!(elapsed <= Duration::from_secs(160), "{:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn unwatch_stops_reads() {
    let h = Harness::new();
    let mut watcher = h.watcher();
    let key = h.key();

    let mut status = watcher.watch(key).subscribe();
    status.wait_for(|s| s.phase == ReconcilePhase::Fetching).await.unwrap();

    assert!(watcher.unwatch(&key));
    assert!(!watcher.unwatch(&key));
    let reads = h.ledger.read_count();

    sleep(Duration::from_secs(600)).await;
    assert_eq!(h.ledger.read_count(), reads);
    assert!(watcher.view(&key).is_none());
}

#[tokio::test(start_paused = true)]
async fn uninitialized_pool_reports_error_without_state() {
    let h = Harness::new();
    let address = h.fetcher.project_address(&h.key());
    h.ledger.remove_account(&address);

    let handle = h.spawn();
    let status = handle.wait_for_fetches(1).await;

    assert!(status.state.is_none());
    assert_eq!(status.last_error, Some(FetchError::NotInitialized));
    assert!(handle.view().is_none());
}
