//! Per-entity reconciliation loop.
//!
//! Each watched entity owns one background task that fetches snapshots on a
//! jittered timer or on demand, and a second task that recomputes the
//! [`EntityView`] from the cached snapshots without touching the network.
//! Fetches of one entity never overlap: triggers that arrive while a fetch is
//! running collapse into a single follow-up fetch.

use std::sync::Arc;

use serde::Serialize;
use stakesync_core::{
    accept_snapshot, Acceptance, Action, Confirmation, EntityView, FetchError, MutationError,
    MutationResult, SyncedState, UnixTimestamp,
};
use stakesync_ledger::{EntityKey, SnapshotFetcher};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::coordinator::{ActionGate, MutationCoordinator};
use crate::policy::{Cooldown, ReconcilePolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReconcilePhase {
    Idle,
    Fetching,
}

/// Published state of one entity's loop
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileStatus {
    pub phase: ReconcilePhase,
    /// Last accepted snapshots; survives failed and stale fetches
    pub state: Option<SyncedState>,
    /// Error of the most recent fetch, cleared by the next successful one
    pub last_error: Option<FetchError>,
    /// Completed fetches, successful or not
    pub fetches: u64,
    /// Fetches discarded because an accumulator went backwards
    pub stale_discards: u64,
}

impl ReconcileStatus {
    fn new() -> Self {
        Self {
            phase: ReconcilePhase::Idle,
            state: None,
            last_error: None,
            fetches: 0,
            stale_discards: 0,
        }
    }
}

/// Handle to a watched entity. Dropping it stops the entity's tasks.
pub struct EntityHandle {
    key: EntityKey,
    fetcher: Arc<SnapshotFetcher>,
    coordinator: Arc<MutationCoordinator>,
    trigger: Arc<Notify>,
    status: watch::Receiver<ReconcileStatus>,
    view: watch::Receiver<Option<EntityView>>,
    refresh_cooldown: Cooldown,
    native_vault_buffer: u128,
    pub(crate) gate: ActionGate,
    tasks: Vec<JoinHandle<()>>,
}

impl EntityHandle {
    /// Start reconciling `key`. The first fetch is issued immediately.
    pub fn spawn(
        key: EntityKey,
        fetcher: Arc<SnapshotFetcher>,
        coordinator: Arc<MutationCoordinator>,
        policy: ReconcilePolicy,
    ) -> Self {
        let trigger = Arc::new(Notify::new());
        let (status_tx, status_rx) = watch::channel(ReconcileStatus::new());
        let (view_tx, view_rx) = watch::channel(None);

        let reconcile = tokio::spawn(run_loop(
            key,
            fetcher.clone(),
            trigger.clone(),
            status_tx,
            policy,
        ));
        let ticker = tokio::spawn(run_view_ticker(key, status_rx.clone(), view_tx, policy));

        info!(entity = %key, "Watching pool");

        Self {
            key,
            fetcher,
            gate: ActionGate::new(coordinator.action_cooldown()),
            coordinator,
            trigger,
            status: status_rx,
            view: view_rx,
            refresh_cooldown: Cooldown::new(policy.manual_refresh_cooldown),
            native_vault_buffer: policy.native_vault_buffer,
            tasks: vec![reconcile, ticker],
        }
    }

    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    pub(crate) fn fetcher(&self) -> &SnapshotFetcher {
        &self.fetcher
    }

    pub fn native_vault_buffer(&self) -> u128 {
        self.native_vault_buffer
    }

    pub fn status(&self) -> ReconcileStatus {
        self.status.borrow().clone()
    }

    /// Last accepted snapshots, if any
    pub fn state(&self) -> Option<SyncedState> {
        self.status.borrow().state.clone()
    }

    /// View published by the last tick
    pub fn view(&self) -> Option<EntityView> {
        self.view.borrow().clone()
    }

    /// View recomputed for `now` from the cached snapshots
    pub fn view_at(&self, now: UnixTimestamp) -> Option<EntityView> {
        let status = self.status.borrow();
        status
            .state
            .as_ref()
            .map(|state| EntityView::derive(state, now, self.native_vault_buffer, status.last_error.is_some()))
    }

    pub fn subscribe(&self) -> watch::Receiver<ReconcileStatus> {
        self.status.clone()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<Option<EntityView>> {
        self.view.clone()
    }

    /// Wait until at least `count` fetches have completed
    pub async fn wait_for_fetches(&self, count: u64) -> ReconcileStatus {
        let mut status = self.status.clone();
        let reached = status.wait_for(|s| s.fetches >= count).await.map(|s| (*s).clone());
        reached.unwrap_or_else(|_| self.status())
    }

    /// User-requested reconciliation, rate limited on its own cooldown
    pub fn refresh(&self) -> MutationResult<()> {
        self.refresh_cooldown
            .try_start()
            .map_err(|left| MutationError::CooldownActive { retry_in_ms: left.as_millis() as u64 })?;
        debug!(entity = %self.key, "Manual refresh requested");
        self.request_reconcile();
        Ok(())
    }

    /// Schedule a fetch without any cooldown. Coalesces with other pending
    /// requests.
    pub fn request_reconcile(&self) {
        self.trigger.notify_one();
    }

    pub async fn stake(&self, amount: u128) -> MutationResult<Confirmation> {
        self.coordinator.execute(self, Action::Stake(amount)).await
    }

    pub async fn unstake(&self, amount: u128) -> MutationResult<Confirmation> {
        self.coordinator.execute(self, Action::Unstake(amount)).await
    }

    pub async fn claim_reward(&self) -> MutationResult<Confirmation> {
        self.coordinator.execute(self, Action::ClaimReward).await
    }

    pub async fn claim_reflection(&self) -> MutationResult<Confirmation> {
        self.coordinator.execute(self, Action::ClaimReflection).await
    }

    pub async fn force_refresh(&self) -> MutationResult<Confirmation> {
        self.coordinator.execute(self, Action::ForceRefreshAccumulator).await
    }
}

impl Drop for EntityHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        debug!(entity = %self.key, "Stopped watching pool");
    }
}

async fn run_loop(
    key: EntityKey,
    fetcher: Arc<SnapshotFetcher>,
    trigger: Arc<Notify>,
    status: watch::Sender<ReconcileStatus>,
    policy: ReconcilePolicy,
) {
    loop {
        reconcile_once(&key, &fetcher, &status).await;

        let delay = policy.jitter.next_delay();
        trace!(entity = %key, delay_secs = delay.as_secs(), "Next reconciliation scheduled");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                debug!(entity = %key, "Periodic reconciliation");
            }
            _ = trigger.notified() => {
                debug!(entity = %key, "Triggered reconciliation");
            }
        }
    }
}

async fn reconcile_once(
    key: &EntityKey,
    fetcher: &SnapshotFetcher,
    status: &watch::Sender<ReconcileStatus>,
) {
    status.send_modify(|s| s.phase = ReconcilePhase::Fetching);
    let result = fetcher.fetch(key).await;
    let now = unix_now();

    status.send_modify(|s| {
        s.phase = ReconcilePhase::Idle;
        s.fetches += 1;

        match result {
            Ok((pool, stake)) => {
                s.last_error = None;
                match accept_snapshot(s.state.as_ref().map(|state| state.pool.as_ref()), &pool) {
                    Acceptance::Fresh => {
                        info!(
                            entity = %key,
                            total_staked = pool.total_staked as u64,
                            staked = stake.as_ref().map(|st| st.staked_amount as u64),
                            "Accepted snapshot"
                        );
                        s.state = Some(SyncedState::new(pool, stake, now));
                    }
                    Acceptance::Stale { accumulator, cached, fetched } => {
                        warn!(
                            entity = %key,
                            accumulator,
                            cached = cached as u64,
                            fetched = fetched as u64,
                            "Discarded stale snapshot"
                        );
                        s.stale_discards += 1;
                    }
                }
            }
            Err(err) => {
                warn!(entity = %key, error = %err, "Reconciliation failed, keeping last snapshot");
                s.last_error = Some(err);
            }
        }
    });
}

async fn run_view_ticker(
    key: EntityKey,
    mut status: watch::Receiver<ReconcileStatus>,
    view: watch::Sender<Option<EntityView>>,
    policy: ReconcilePolicy,
) {
    let mut ticker = tokio::time::interval(policy.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let next = {
            let current = status.borrow_and_update();
            current.state.as_ref().map(|state| {
                EntityView::derive(state, unix_now(), policy.native_vault_buffer, current.last_error.is_some())
            })
        };
        trace!(entity = %key, has_view = next.is_some(), "Recomputed view");
        view.send_replace(next);
    }
}

pub(crate) fn unix_now() -> UnixTimestamp {
    chrono::Utc::now().timestamp()
}
