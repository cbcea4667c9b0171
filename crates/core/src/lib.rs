//! # stakesync core
//!
//! Ledger-independent building blocks of the pool synchronization engine:
//!
//! - Snapshot types for pools and stakes
//! - The accrual engine reproducing the program's reward and reflection math
//! - The acceptance rule for reconciled snapshots
//! - The view model and the error taxonomy
//!
//! Nothing in this crate performs I/O.

pub mod accrual;
pub mod constants;
pub mod errors;
pub mod math;
pub mod reconcile;
pub mod types;
pub mod view;

// Re-export commonly used items
pub use accrual::{accrue, AccrualResult, LockStatus};
pub use constants::*;
pub use errors::{FetchError, FetchResult, MutationError, MutationResult};
pub use reconcile::{accept_snapshot, Acceptance, SyncedState};
pub use types::*;
pub use view::EntityView;
