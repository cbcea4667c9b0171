//! # Error Types
//!
//! Read-side (`FetchError`) and write-side (`MutationError`) failures. A
//! `FetchError` is never surfaced to callers as a hard failure: the
//! reconciliation loop logs it and keeps the last good snapshot.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PauseKind;

/// Failure to capture a snapshot from the ledger
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchError {
    /// Pool account does not exist or is not initialized
    #[error("Pool is not initialized on-chain")]
    NotInitialized,

    /// Transport or provider failure; retried on the caller's own schedule
    #[error("Transient ledger error: {0}")]
    Transient(String),

    /// Account data could not be decoded
    #[error("Malformed account data: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// Failure of a user-initiated state change
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationError {
    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u128, available: u128 },

    #[error("Stake is still locked for {unlock_in_seconds}s")]
    StillLocked { unlock_in_seconds: u64 },

    #[error("Pool is paused for {0}")]
    PoolPaused(PauseKind),

    #[error("Another action is already in progress for this pool")]
    AlreadyInProgress,

    #[error("Cancelled by user")]
    UserCancelled,

    #[error("Nothing to claim")]
    NothingToClaim,

    #[error("Please wait {retry_in_ms}ms before trying again")]
    CooldownActive { retry_in_ms: u64 },

    #[error("Pool state has not been loaded yet")]
    SnapshotUnavailable,
}

pub type FetchResult<T> = Result<T, FetchError>;
pub type MutationResult<T> = Result<T, MutationError>;
