//! Registry of watched pool entities.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::signature::Signature;
use stakesync_core::{Action, Confirmation, EntityView, MutationError, MutationResult};
use stakesync_ledger::{ActionSubmitter, EntityKey, Ledger, RequestScheduler, SnapshotFetcher, SubmitError};
use tracing::info;

use crate::config::SyncConfig;
use crate::coordinator::MutationCoordinator;
use crate::policy::ReconcilePolicy;
use crate::reconciler::EntityHandle;

/// Owns one [`EntityHandle`] per watched entity. All entities share one
/// scheduler through the fetcher, so adding entities never raises the
/// request rate.
pub struct PoolWatcher {
    fetcher: Arc<SnapshotFetcher>,
    coordinator: Arc<MutationCoordinator>,
    policy: ReconcilePolicy,
    entities: HashMap<EntityKey, EntityHandle>,
}

impl PoolWatcher {
    pub fn new(
        fetcher: Arc<SnapshotFetcher>,
        coordinator: Arc<MutationCoordinator>,
        policy: ReconcilePolicy,
    ) -> Self {
        Self {
            fetcher,
            coordinator,
            policy,
            entities: HashMap::new(),
        }
    }

    /// Wire a watcher from configuration
    pub fn from_config(
        config: &SyncConfig,
        ledger: Arc<dyn Ledger>,
        submitter: Arc<dyn ActionSubmitter>,
    ) -> Self {
        let scheduler = Arc::new(RequestScheduler::new(config.scheduler_interval()));
        let fetcher = Arc::new(SnapshotFetcher::new(ledger, scheduler, config.program_id));
        let coordinator = Arc::new(MutationCoordinator::new(submitter, config.action_cooldown()));
        Self::new(fetcher, coordinator, config.reconcile_policy())
    }

    pub fn fetcher(&self) -> &Arc<SnapshotFetcher> {
        &self.fetcher
    }

    /// Start watching `key`; watching an entity twice keeps the first handle
    pub fn watch(&mut self, key: EntityKey) -> &EntityHandle {
        let (fetcher, coordinator, policy) = (&self.fetcher, &self.coordinator, self.policy);
        self.entities
            .entry(key)
            .or_insert_with(|| EntityHandle::spawn(key, fetcher.clone(), coordinator.clone(), policy))
    }

    /// Stop watching `key`. Returns whether it was watched.
    pub fn unwatch(&mut self, key: &EntityKey) -> bool {
        let removed = self.entities.remove(key).is_some();
        if removed {
            info!(entity = %key, "Unwatched pool");
        }
        removed
    }

    pub fn handle(&self, key: &EntityKey) -> Option<&EntityHandle> {
        self.entities.get(key)
    }

    pub fn watched(&self) -> impl Iterator<Item = &EntityKey> {
        self.entities.keys()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn view(&self, key: &EntityKey) -> Option<EntityView> {
        self.entities.get(key).and_then(|handle| handle.view())
    }

    pub fn refresh(&self, key: &EntityKey) -> MutationResult<()> {
        self.require(key)?.refresh()
    }

    pub async fn stake(&self, key: &EntityKey, amount: u128) -> MutationResult<Confirmation> {
        self.execute(key, Action::Stake(amount)).await
    }

    pub async fn unstake(&self, key: &EntityKey, amount: u128) -> MutationResult<Confirmation> {
        self.execute(key, Action::Unstake(amount)).await
    }

    pub async fn claim_reward(&self, key: &EntityKey) -> MutationResult<Confirmation> {
        self.execute(key, Action::ClaimReward).await
    }

    pub async fn claim_reflection(&self, key: &EntityKey) -> MutationResult<Confirmation> {
        self.execute(key, Action::ClaimReflection).await
    }

    pub async fn force_refresh(&self, key: &EntityKey) -> MutationResult<Confirmation> {
        self.execute(key, Action::ForceRefreshAccumulator).await
    }

    async fn execute(&self, key: &EntityKey, action: Action) -> MutationResult<Confirmation> {
        let handle = self.require(key)?;
        self.coordinator.execute(handle, action).await
    }

    fn require(&self, key: &EntityKey) -> MutationResult<&EntityHandle> {
        self.entities.get(key).ok_or(MutationError::SnapshotUnavailable)
    }
}

/// Submitter for watch-only deployments: every action is rejected
pub struct ReadOnlySubmitter;

#[async_trait]
impl ActionSubmitter for ReadOnlySubmitter {
    async fn submit(&self, _entity: &EntityKey, action: &Action) -> Result<Signature, SubmitError> {
        Err(SubmitError::rejected(format!("{} is not available in watch-only mode", action)))
    }
}
