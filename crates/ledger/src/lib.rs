//! # stakesync ledger
//!
//! Access to the staking program's state on a rate-limited RPC provider.
//!
//! - [`Ledger`] / [`ActionSubmitter`]: the two seams to the outside world
//! - [`RequestScheduler`]: process-wide spacing of reads
//! - [`SnapshotFetcher`]: turns raw accounts into pool and stake snapshots

pub mod accounts;
pub mod entity;
pub mod error;
pub mod fetcher;
pub mod ledger;
pub mod pda;
pub mod scheduler;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use entity::EntityKey;
pub use error::{LedgerError, LedgerResult, SubmitError, SubmitErrorKind};
pub use fetcher::{MintInfo, SnapshotFetcher};
pub use ledger::{ActionSubmitter, Ledger, LedgerAccount, RpcLedger, SignatureOutcome};
pub use pda::PdaBuilder;
pub use scheduler::{Permit, RequestScheduler, DEFAULT_MIN_INTERVAL};

/// Staking program deployed on mainnet
pub const DEFAULT_PROGRAM_ID: solana_sdk::pubkey::Pubkey =
    solana_sdk::pubkey!("7uKLyDU3tS6daQ9ic18gjoxkxBYuhTjswHiG6pD4R9fa");
