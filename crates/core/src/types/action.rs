//! User-initiated state changes and their outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::snapshot::PauseKind;

/// A state-changing action against one pool entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Deposit principal, in base units
    Stake(u128),
    /// Withdraw principal, in base units
    Unstake(u128),
    ClaimReward,
    ClaimReflection,
    /// Fold newly arrived reflection vault tokens into the accumulator
    /// without claiming
    ForceRefreshAccumulator,
}

impl Action {
    /// Pause class that gates this action
    pub fn pause_kind(&self) -> PauseKind {
        match self {
            Action::Stake(_) => PauseKind::Deposits,
            Action::Unstake(_) => PauseKind::Withdrawals,
            Action::ClaimReward | Action::ClaimReflection => PauseKind::Claims,
            // The program only honors the global switch for refreshes
            Action::ForceRefreshAccumulator => PauseKind::All,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Stake(_) => "stake",
            Action::Unstake(_) => "unstake",
            Action::ClaimReward => "claim_reward",
            Action::ClaimReflection => "claim_reflection",
            Action::ForceRefreshAccumulator => "refresh_reflections",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Stake(amount) | Action::Unstake(amount) => {
                write!(f, "{}({})", self.name(), amount)
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// Outcome of an action the ledger accepted, or is presumed to have accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
    Success { signature: String },
    /// The submission errored in a way consistent with the transaction having
    /// already landed. Reconciliation confirms it.
    PresumedSuccess { signature: Option<String> },
}

impl Confirmation {
    pub fn signature(&self) -> Option<&str> {
        match self {
            Confirmation::Success { signature } => Some(signature),
            Confirmation::PresumedSuccess { signature } => signature.as_deref(),
        }
    }

    pub fn is_presumed(&self) -> bool {
        matches!(self, Confirmation::PresumedSuccess { .. })
    }
}
