//! Immutable ledger snapshots captured at one reconciliation instant.
//!
//! Snapshots are never mutated in place. A newer fetch produces a new value
//! that supersedes the cached one wholesale.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::RATE_MODE_FIXED_APY;

/// Unix timestamp in seconds, ledger clock
pub type UnixTimestamp = i64;

/// How the displayed annual rate of a pool is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateMode {
    /// Stored basis points are the rate
    FixedApy,
    /// Rate derived from the emission rate and the current total stake
    DynamicPool,
}

impl RateMode {
    pub fn from_onchain(mode: u8) -> Self {
        if mode == RATE_MODE_FIXED_APY {
            RateMode::FixedApy
        } else {
            RateMode::DynamicPool
        }
    }
}

/// Class of action a pause flag applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauseKind {
    Deposits,
    Withdrawals,
    Claims,
    All,
}

impl fmt::Display for PauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PauseKind::Deposits => "deposits",
            PauseKind::Withdrawals => "withdrawals",
            PauseKind::Claims => "claims",
            PauseKind::All => "all actions",
        };
        f.write_str(name)
    }
}

/// Pause switches of a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PauseFlags {
    pub deposits: bool,
    pub withdrawals: bool,
    pub claims: bool,
    pub all: bool,
}

impl PauseFlags {
    /// Returns the flag that blocks `kind`, if any. The global flag wins over
    /// the per-class flag so the reported reason is the broader one.
    pub fn blocking(&self, kind: PauseKind) -> Option<PauseKind> {
        if self.all {
            return Some(PauseKind::All);
        }
        let blocked = match kind {
            PauseKind::Deposits => self.deposits,
            PauseKind::Withdrawals => self.withdrawals,
            PauseKind::Claims => self.claims,
            PauseKind::All => false,
        };
        blocked.then_some(kind)
    }

    pub fn any(&self) -> bool {
        self.deposits || self.withdrawals || self.claims || self.all
    }
}

/// Pool-wide parameters and accumulators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub rate_bps_per_year: u64,
    pub rate_mode: RateMode,
    /// Whole-pool emission in base units per second
    pub reward_rate_per_second: u64,
    pub lockup_seconds: u64,
    pub pool_duration_seconds: u64,
    pub pool_start_time: UnixTimestamp,
    /// Stored end time; zero when the program left it unset
    pub pool_end_time: UnixTimestamp,
    /// Last on-chain checkpoint of `reward_per_token_accumulated`
    pub last_update_time: UnixTimestamp,

    pub total_staked: u128,
    pub token_decimals: u8,

    /// Scaled by `SCALE`, non-decreasing
    pub reward_per_token_accumulated: u128,
    /// Scaled by `SCALE`, non-decreasing
    pub reflection_per_token_accumulated: u128,

    pub reflections_enabled: bool,
    pub reflection_asset_is_native: bool,
    pub reflection_decimals: u8,
    /// Token amount held by the vault, as the program reads it. Present
    /// when the vault was read during this reconciliation.
    pub reflection_vault_balance: Option<u128>,
    /// Lamports held by the vault account, rent reserve included. Only the
    /// native-asset clamp uses it.
    #[serde(default)]
    pub reflection_vault_lamports: Option<u128>,
    /// Vault balance already folded into the reflection accumulator
    pub last_reflection_balance: u128,

    pub paused: PauseFlags,
    pub captured_at: UnixTimestamp,
}

impl PoolSnapshot {
    /// End of the reward schedule. Falls back to start + duration when the
    /// stored value is unset.
    pub fn pool_end_time(&self) -> UnixTimestamp {
        if self.pool_end_time > 0 {
            return self.pool_end_time;
        }
        if self.pool_start_time > 0 && self.pool_duration_seconds > 0 {
            return self
                .pool_start_time
                .saturating_add(i64::try_from(self.pool_duration_seconds).unwrap_or(i64::MAX));
        }
        0
    }

    pub fn has_ended_at(&self, now: UnixTimestamp) -> bool {
        let end = self.pool_end_time();
        end > 0 && now >= end
    }
}

/// One wallet's position in one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeSnapshot {
    pub staked_amount: u128,
    pub last_stake_timestamp: UnixTimestamp,

    pub reward_per_token_paid: u128,
    pub pending_reward_at_last_checkpoint: u128,

    pub reflection_per_token_paid: u128,
    pub pending_reflection_at_last_checkpoint: u128,
    /// Subtracted from newly earned reflections, cleared on the next checkpoint
    pub reflection_debt: u128,

    pub captured_at: UnixTimestamp,
}

impl StakeSnapshot {
    pub fn lock_expiry(&self, lockup_seconds: u64) -> UnixTimestamp {
        self.last_stake_timestamp
            .saturating_add(i64::try_from(lockup_seconds).unwrap_or(i64::MAX))
    }

    pub fn has_stake(&self) -> bool {
        self.staked_amount > 0
    }
}
