use std::sync::Arc;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature};
use stakesync_core::Action;
use tracing::debug;

use crate::entity::EntityKey;
use crate::error::{LedgerResult, SubmitError};

/// Raw account as returned by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAccount {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// Known status of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureOutcome {
    /// Landed without error at the ledger's commitment level
    Confirmed,
    /// Seen by the cluster without error, not yet at the commitment level
    Processed,
    /// Landed and failed
    Failed(String),
}

/// Read access to the remote ledger
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fetch an account, `None` when it does not exist
    async fn get_account(&self, address: &Pubkey) -> LedgerResult<Option<LedgerAccount>>;

    /// Status of a transaction, `None` when the cluster has no record of it
    async fn signature_status(&self, signature: &Signature)
        -> LedgerResult<Option<SignatureOutcome>>;
}

/// Builds, signs and sends the transaction for one action
#[async_trait]
pub trait ActionSubmitter: Send + Sync {
    async fn submit(&self, entity: &EntityKey, action: &Action) -> Result<Signature, SubmitError>;
}

/// [`Ledger`] over the nonblocking Solana RPC client
pub struct RpcLedger {
    rpc: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcLedger {
    pub fn new(rpc_url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            rpc: Arc::new(RpcClient::new_with_commitment(rpc_url.into(), commitment)),
            commitment,
        }
    }

    pub fn from_client(rpc: Arc<RpcClient>) -> Self {
        let commitment = rpc.commitment();
        Self { rpc, commitment }
    }

    /// Get the RPC client
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Get the RPC endpoint URL
    pub fn rpc_url(&self) -> String {
        self.rpc.url()
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn get_account(&self, address: &Pubkey) -> LedgerResult<Option<LedgerAccount>> {
        let account = self
            .rpc
            .get_account_with_commitment(address, self.commitment)
            .await?
            .value;

        debug!(%address, found = account.is_some(), "Fetched account");
        Ok(account.map(|account| LedgerAccount {
            lamports: account.lamports,
            owner: account.owner,
            data: account.data,
        }))
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> LedgerResult<Option<SignatureOutcome>> {
        let statuses = self.rpc.get_signature_statuses(&[*signature]).await?.value;

        let outcome = statuses.into_iter().next().flatten().map(|status| {
            if let Some(err) = &status.err {
                SignatureOutcome::Failed(err.to_string())
            } else if status.satisfies_commitment(self.commitment) {
                SignatureOutcome::Confirmed
            } else {
                SignatureOutcome::Processed
            }
        });

        debug!(%signature, ?outcome, "Queried signature status");
        Ok(outcome)
    }
}
