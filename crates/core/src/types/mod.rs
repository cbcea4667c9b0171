//! # Core Type Definitions
//!
//! Ledger snapshots and the user action vocabulary shared by the fetcher,
//! the reconciliation loop and the mutation coordinator.

pub mod action;
pub mod snapshot;

pub use action::*;
pub use snapshot::*;
