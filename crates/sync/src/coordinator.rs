//! Serializes user actions per entity and classifies their outcome.
//!
//! An action passes, in order: the entity's in-flight gate, the action
//! cooldown, the advisory preconditions against the cached snapshot, and
//! finally the injected [`ActionSubmitter`]. Ambiguous submission errors are
//! resolved by asking the ledger for the transaction status first and only
//! then by inspecting the error text.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stakesync_core::accrual::{accrued_reflection, accrued_reward, lock_status};
use stakesync_core::{Action, Confirmation, MutationError, MutationResult, SyncedState, UnixTimestamp};
use stakesync_ledger::{ActionSubmitter, SignatureOutcome, SubmitError, SubmitErrorKind};
use tracing::{debug, error, info, warn};

use crate::policy::Cooldown;
use crate::reconciler::{unix_now, EntityHandle};

/// Error fragments meaning the transaction already landed
const ALREADY_PROCESSED_MARKERS: [&str; 3] = [
    "already been processed",
    "AlreadyProcessed",
    "already processed",
];

/// Error fragments meaning the wallet declined to sign
const USER_REJECTED_MARKERS: [&str; 2] = ["User rejected", "user rejected"];

/// Per-entity mutation state
#[derive(Debug)]
pub struct ActionGate {
    in_flight: AtomicBool,
    cooldown: Cooldown,
}

impl ActionGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            cooldown: Cooldown::new(cooldown),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn enter(&self) -> MutationResult<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight { gate: self })
            .map_err(|_| MutationError::AlreadyInProgress)
    }
}

/// Clears the in-flight flag when the action finishes, however it finishes
struct InFlight<'a> {
    gate: &'a ActionGate,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}

pub struct MutationCoordinator {
    submitter: Arc<dyn ActionSubmitter>,
    action_cooldown: Duration,
}

impl MutationCoordinator {
    pub fn new(submitter: Arc<dyn ActionSubmitter>, action_cooldown: Duration) -> Self {
        Self { submitter, action_cooldown }
    }

    pub fn action_cooldown(&self) -> Duration {
        self.action_cooldown
    }

    /// Run one action for the entity behind `handle`
    pub async fn execute(&self, handle: &EntityHandle, action: Action) -> MutationResult<Confirmation> {
        let key = *handle.key();
        let _in_flight = handle.gate.enter()?;

        if let Some(left) = handle.gate.cooldown.remaining() {
            return Err(MutationError::CooldownActive { retry_in_ms: left.as_millis() as u64 });
        }

        let state = handle.state().ok_or(MutationError::SnapshotUnavailable)?;
        let now = unix_now();
        check_preconditions(&state, action, now, handle.native_vault_buffer())?;

        if let Action::Stake(amount) = action {
            match handle.fetcher().fetch_wallet_balance(&key).await {
                Ok(available) if available < amount => {
                    return Err(MutationError::InsufficientFunds { required: amount, available });
                }
                Ok(_) => {}
                Err(err) => warn!(entity = %key, error = %err, "Wallet balance unavailable, skipping check"),
            }
        }

        // Cooldown starts once an action is actually sent
        handle.gate.cooldown.restart();
        info!(entity = %key, %action, "Submitting action");

        let outcome = match self.submitter.submit(&key, &action).await {
            Ok(signature) => Ok(Confirmation::Success { signature: signature.to_string() }),
            Err(err) => self.classify(handle, err).await,
        };

        match &outcome {
            Ok(confirmation) => {
                info!(
                    entity = %key,
                    %action,
                    signature = confirmation.signature().unwrap_or("unknown"),
                    presumed = confirmation.is_presumed(),
                    "Action confirmed"
                );
                handle.request_reconcile();
            }
            Err(MutationError::UserCancelled) => info!(entity = %key, %action, "Action cancelled by user"),
            Err(err) => error!(entity = %key, %action, error = %err, "Action failed"),
        }

        outcome
    }

    async fn classify(&self, handle: &EntityHandle, err: SubmitError) -> MutationResult<Confirmation> {
        if err.kind == SubmitErrorKind::UserCancelled || contains_any(&err.message, &USER_REJECTED_MARKERS) {
            return Err(MutationError::UserCancelled);
        }

        if let Some(signature) = err.signature {
            match handle.fetcher().signature_status(&signature).await {
                Ok(Some(SignatureOutcome::Confirmed)) => {
                    return Ok(Confirmation::Success { signature: signature.to_string() });
                }
                Ok(Some(SignatureOutcome::Processed)) => {
                    return Ok(Confirmation::PresumedSuccess { signature: Some(signature.to_string()) });
                }
                Ok(Some(SignatureOutcome::Failed(reason))) => {
                    return Err(MutationError::Rejected(reason));
                }
                Ok(None) => debug!(%signature, "Ledger has no record of the transaction"),
                Err(status_err) => warn!(%signature, error = %status_err, "Status query failed"),
            }
        }

        if contains_any(&err.message, &ALREADY_PROCESSED_MARKERS) {
            return Ok(Confirmation::PresumedSuccess {
                signature: err.signature.map(|s| s.to_string()),
            });
        }

        Err(MutationError::Rejected(err.message))
    }
}

fn contains_any(message: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| message.contains(marker))
}

/// Advisory checks against the cached snapshot. The program enforces the
/// same rules; these only avoid submitting transactions doomed to fail.
pub fn check_preconditions(
    state: &SyncedState,
    action: Action,
    now: UnixTimestamp,
    native_vault_buffer: u128,
) -> MutationResult<()> {
    let pool = state.pool.as_ref();
    let stake = state.stake.as_deref();

    if let Some(kind) = pool.paused.blocking(action.pause_kind()) {
        return Err(MutationError::PoolPaused(kind));
    }

    match action {
        Action::Stake(amount) => {
            if amount == 0 {
                return Err(MutationError::Rejected("Amount must be greater than zero".to_string()));
            }
            if pool.has_ended_at(now) {
                return Err(MutationError::Rejected("Pool has ended".to_string()));
            }
        }
        Action::Unstake(amount) => {
            if amount == 0 {
                return Err(MutationError::Rejected("Amount must be greater than zero".to_string()));
            }
            let staked = stake.map_or(0, |s| s.staked_amount);
            if staked < amount {
                return Err(MutationError::InsufficientFunds { required: amount, available: staked });
            }
            let lock = lock_status(pool, stake, now);
            if lock.is_locked {
                return Err(MutationError::StillLocked { unlock_in_seconds: lock.unlock_in_seconds });
            }
        }
        Action::ClaimReward => {
            let reward = stake.map_or(0, |s| accrued_reward(pool, s, now));
            if reward == 0 {
                return Err(MutationError::NothingToClaim);
            }
        }
        Action::ClaimReflection => {
            if !pool.reflections_enabled {
                return Err(MutationError::Rejected("Reflections are not enabled for this pool".to_string()));
            }
            let reflection = stake.map_or(0, |s| accrued_reflection(pool, s, native_vault_buffer));
            if reflection == 0 {
                return Err(MutationError::NothingToClaim);
            }
        }
        Action::ForceRefreshAccumulator => {
            if !pool.reflections_enabled {
                return Err(MutationError::Rejected("Reflections are not enabled for this pool".to_string()));
            }
            if !stake.is_some_and(|s| s.has_stake()) {
                return Err(MutationError::Rejected("No active stake in this pool".to_string()));
            }
        }
    }

    Ok(())
}
