pub mod config;
pub mod coordinator;
pub mod error;
pub mod policy;
pub mod reconciler;
pub mod service;

pub use config::{PoolConfig, SyncConfig};
pub use coordinator::{ActionGate, MutationCoordinator};
pub use error::{SyncError, SyncResult};
pub use policy::{Cooldown, JitterPolicy, ReconcilePolicy};
pub use reconciler::{EntityHandle, ReconcilePhase, ReconcileStatus};
pub use service::{PoolWatcher, ReadOnlySubmitter};
