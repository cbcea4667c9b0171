//! Ledger access error types

use solana_sdk::signature::Signature;
use stakesync_core::FetchError;
use thiserror::Error;

/// Failure of a single ledger read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// RPC transport or provider error
    #[error("RPC error: {0}")]
    Transport(String),

    /// Account data did not match the expected layout
    #[error("Failed to deserialize account {account}: {reason}")]
    Decode { account: String, reason: String },
}

impl LedgerError {
    pub fn decode(account: impl Into<String>, reason: impl ToString) -> Self {
        LedgerError::Decode {
            account: account.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<solana_client::client_error::ClientError> for LedgerError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        LedgerError::Transport(err.to_string())
    }
}

impl From<LedgerError> for FetchError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Transport(message) => FetchError::Transient(message),
            decode @ LedgerError::Decode { .. } => FetchError::Malformed(decode.to_string()),
        }
    }
}

/// Why a submission failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitErrorKind {
    /// The ledger or the wallet reported an error
    Rejected,
    /// The user declined to sign
    UserCancelled,
    /// The request never got a definite answer
    Transport,
}

/// Failure reported by an [`ActionSubmitter`](crate::ledger::ActionSubmitter)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SubmitError {
    pub kind: SubmitErrorKind,
    pub message: String,
    /// Signature of the transaction, when it was signed before failing
    pub signature: Option<Signature>,
}

impl SubmitError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self { kind: SubmitErrorKind::Rejected, message: message.into(), signature: None }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self { kind: SubmitErrorKind::Transport, message: message.into(), signature: None }
    }

    pub fn user_cancelled() -> Self {
        Self {
            kind: SubmitErrorKind::UserCancelled,
            message: "User rejected the request".to_string(),
            signature: None,
        }
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
