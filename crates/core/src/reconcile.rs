//! # Snapshot Reconciliation Rules
//!
//! Decides whether a freshly fetched snapshot may replace the cached one.
//! Accumulators only ever grow on-chain, so a fetch reporting a lower value
//! came from a lagging RPC node and is discarded rather than merged.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::{PoolSnapshot, StakeSnapshot, UnixTimestamp};

/// Last accepted ledger state of one entity, replaced wholesale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedState {
    pub pool: Arc<PoolSnapshot>,
    pub stake: Option<Arc<StakeSnapshot>>,
    pub reconciled_at: UnixTimestamp,
}

impl SyncedState {
    pub fn new(pool: PoolSnapshot, stake: Option<StakeSnapshot>, reconciled_at: UnixTimestamp) -> Self {
        Self {
            pool: Arc::new(pool),
            stake: stake.map(Arc::new),
            reconciled_at,
        }
    }
}

/// Verdict on a fetched snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    Fresh,
    Stale {
        accumulator: &'static str,
        cached: u128,
        fetched: u128,
    },
}

impl Acceptance {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Acceptance::Fresh)
    }
}

/// Checks both pool accumulators against the cached snapshot
pub fn accept_snapshot(cached: Option<&PoolSnapshot>, fetched: &PoolSnapshot) -> Acceptance {
    let Some(cached) = cached else {
        return Acceptance::Fresh;
    };

    if fetched.reward_per_token_accumulated < cached.reward_per_token_accumulated {
        return Acceptance::Stale {
            accumulator: "reward_per_token",
            cached: cached.reward_per_token_accumulated,
            fetched: fetched.reward_per_token_accumulated,
        };
    }

    if fetched.reflection_per_token_accumulated < cached.reflection_per_token_accumulated {
        return Acceptance::Stale {
            accumulator: "reflection_per_token",
            cached: cached.reflection_per_token_accumulated,
            fetched: fetched.reflection_per_token_accumulated,
        };
    }

    Acceptance::Fresh
}
