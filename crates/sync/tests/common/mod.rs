#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use stakesync::{EntityHandle, MutationCoordinator, PoolWatcher, ReconcilePolicy};
use stakesync_ledger::accounts::{ProjectAccount, StakeAccount};
use stakesync_ledger::testing::{MockLedger, MockSubmitter};
use stakesync_ledger::{EntityKey, RequestScheduler, SnapshotFetcher};

pub const SOL: u64 = 1_000_000_000;
pub const READ_SPACING: Duration = Duration::from_millis(2_000);

/// One pool with a wrapped native reflection vault, one wallet and in-memory
/// ledger and submitter
pub struct Harness {
    pub ledger: Arc<MockLedger>,
    pub submitter: Arc<MockSubmitter>,
    pub fetcher: Arc<SnapshotFetcher>,
    pub coordinator: Arc<MutationCoordinator>,
    pub program_id: Pubkey,
    pub mint: Pubkey,
    pub wallet: Pubkey,
    pub vault: Pubkey,
    pub project: ProjectAccount,
}

impl Harness {
    pub fn new() -> Self {
        let ledger = Arc::new(MockLedger::new());
        let submitter = Arc::new(MockSubmitter::new());
        let program_id = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let wallet = Pubkey::new_unique();
        let vault = Pubkey::new_unique();

        let project = ProjectAccount {
            token_mint: mint.to_bytes(),
            pool_id: 0,
            reflection_vault: Some(vault.to_bytes()),
            reflection_token: Some(spl_token_native_mint().to_bytes()),
            total_staked: 10 * SOL,
            rate_mode: 0,
            rate_bps_per_year: 1_200,
            lockup_seconds: 86_400,
            reward_per_token_stored: 5_000_000,
            reflection_per_token_stored: 0,
            last_reflection_balance: 8 * SOL,
            is_initialized: true,
            ..Default::default()
        };
        ledger.set_project(&program_id, &project);
        ledger.set_mint(&mint, 9);
        ledger.set_native_vault(&vault, &Pubkey::new_unique(), 8 * SOL);
        ledger.set_wallet_balance(&wallet, &mint, 10 * SOL);

        let scheduler = Arc::new(RequestScheduler::new(READ_SPACING));
        let fetcher = Arc::new(SnapshotFetcher::new(ledger.clone(), scheduler, program_id));
        let coordinator = Arc::new(MutationCoordinator::new(submitter.clone(), Duration::from_millis(3_000)));

        let harness = Self {
            ledger,
            submitter,
            fetcher,
            coordinator,
            program_id,
            mint,
            wallet,
            vault,
            project,
        };
        harness.set_stake(SOL, now() - 2 * 86_400);
        harness
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.mint, 0, Some(self.wallet))
    }

    pub fn policy(&self) -> ReconcilePolicy {
        ReconcilePolicy::default()
    }

    pub fn spawn(&self) -> EntityHandle {
        EntityHandle::spawn(self.key(), self.fetcher.clone(), self.coordinator.clone(), self.policy())
    }

    pub fn watcher(&self) -> PoolWatcher {
        PoolWatcher::new(self.fetcher.clone(), self.coordinator.clone(), self.policy())
    }

    pub fn set_stake(&self, amount: u64, staked_at: i64) {
        let project = self.fetcher.project_address(&self.key());
        let stake = StakeAccount {
            user: self.wallet.to_bytes(),
            project: project.to_bytes(),
            amount,
            last_stake_timestamp: staked_at,
            ..Default::default()
        };
        self.ledger.set_stake(&self.program_id, &project, &self.wallet, &stake);
    }

    /// Rewrite the pool record with new accumulators
    pub fn set_accumulators(&self, reward: u64, reflection: u64) {
        let mut project = self.project.clone();
        project.reward_per_token_stored = reward;
        project.reflection_per_token_stored = reflection;
        self.ledger.set_project(&self.program_id, &project);
    }
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn spl_token_native_mint() -> Pubkey {
    solana_sdk::pubkey!("So11111111111111111111111111111111111111112")
}
