//! Reads one entity's ledger state and assembles its snapshots.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use solana_sdk::{pubkey::Pubkey, signature::Signature};
use spl_associated_token_account::get_associated_token_address_with_program_id;
use stakesync_core::{
    FetchError, FetchResult, PoolSnapshot, StakeSnapshot, UnixTimestamp, NATIVE_DECIMALS,
};
use tracing::{debug, warn};

use crate::accounts::{
    decode_account, mint_decimals, token_amount, ProjectAccount, StakeAccount, VaultBalance,
    PROJECT_ACCOUNT, STAKE_ACCOUNT,
};
use crate::entity::EntityKey;
use crate::error::LedgerResult;
use crate::ledger::{Ledger, LedgerAccount, SignatureOutcome};
use crate::pda::PdaBuilder;
use crate::scheduler::RequestScheduler;

/// Immutable facts about a mint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintInfo {
    pub decimals: u8,
    /// Token program owning the mint (legacy SPL or Token-2022)
    pub token_program: Pubkey,
}

pub struct SnapshotFetcher {
    ledger: Arc<dyn Ledger>,
    scheduler: Arc<RequestScheduler>,
    pdas: PdaBuilder,
    mints: RwLock<HashMap<Pubkey, MintInfo>>,
}

impl SnapshotFetcher {
    pub fn new(ledger: Arc<dyn Ledger>, scheduler: Arc<RequestScheduler>, program_id: Pubkey) -> Self {
        Self {
            ledger,
            scheduler,
            pdas: PdaBuilder::new(program_id),
            mints: RwLock::new(HashMap::new()),
        }
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    pub fn pdas(&self) -> &PdaBuilder {
        &self.pdas
    }

    /// Pool record address of an entity
    pub fn project_address(&self, key: &EntityKey) -> Pubkey {
        self.pdas.project(&key.token_mint, key.pool_id).0
    }

    /// Read the pool record, the stake record (when a wallet is attached),
    /// the reflection vault and the mint decimals, in that order. Every read
    /// goes through the scheduler.
    pub async fn fetch(&self, key: &EntityKey) -> FetchResult<(PoolSnapshot, Option<StakeSnapshot>)> {
        let project_address = self.project_address(key);
        let account = self
            .read(&project_address)
            .await?
            .ok_or(FetchError::NotInitialized)?;
        let project: ProjectAccount = decode_account(PROJECT_ACCOUNT, &account.data)?;
        if !project.is_initialized {
            return Err(FetchError::NotInitialized);
        }
        let captured_at = now();

        let stake = match &key.wallet {
            Some(wallet) => {
                let (stake_address, _) = self.pdas.stake(&project_address, wallet);
                match self.read(&stake_address).await? {
                    Some(account) => {
                        let stake: StakeAccount = decode_account(STAKE_ACCOUNT, &account.data)?;
                        Some(stake.into_snapshot(captured_at))
                    }
                    None => None,
                }
            }
            None => None,
        };

        let vault_balance = match project.reflection_vault() {
            Some(vault) => Some(self.vault_balance(&vault).await?),
            None => None,
        };

        let token = self.mint_info(&key.token_mint).await?;
        let reflection_decimals = match project.reflection_token() {
            _ if project.is_native_reflection() => NATIVE_DECIMALS,
            Some(mint) if mint != key.token_mint => self.mint_info(&mint).await?.decimals,
            _ => token.decimals,
        };

        debug!(
            entity = %key,
            total_staked = project.total_staked,
            has_stake = stake.is_some(),
            ?vault_balance,
            "Fetched entity snapshot"
        );

        let pool = project.into_snapshot(token.decimals, reflection_decimals, vault_balance, captured_at);
        Ok((pool, stake))
    }

    /// Balance of the staking token in the wallet's associated token account.
    /// A missing account counts as zero; an entity without a wallet has none.
    pub async fn fetch_wallet_balance(&self, key: &EntityKey) -> FetchResult<u128> {
        let Some(wallet) = key.wallet else {
            return Ok(0);
        };
        let mint = self.mint_info(&key.token_mint).await?;
        let ata = get_associated_token_address_with_program_id(&wallet, &key.token_mint, &mint.token_program);

        match self.read(&ata).await? {
            Some(account) => Ok(token_amount(&account.data)? as u128),
            None => Ok(0),
        }
    }

    /// Decimals and owning program of a mint, read once per fetcher
    pub async fn mint_info(&self, mint: &Pubkey) -> FetchResult<MintInfo> {
        if let Some(info) = self.mints.read().ok().and_then(|cache| cache.get(mint).copied()) {
            return Ok(info);
        }

        let account = self
            .read(mint)
            .await?
            .ok_or_else(|| FetchError::Malformed(format!("mint {} does not exist", mint)))?;
        let info = MintInfo {
            decimals: mint_decimals(&account.data)?,
            token_program: account.owner,
        };

        if let Ok(mut cache) = self.mints.write() {
            cache.insert(*mint, info);
        }
        Ok(info)
    }

    /// Status of a submitted transaction, paced like any other read
    pub async fn signature_status(&self, signature: &Signature) -> LedgerResult<Option<SignatureOutcome>> {
        let permit = self.scheduler.acquire().await;
        debug!(%signature, permit = permit.sequence, "Querying signature status");
        self.ledger.signature_status(signature).await
    }

    /// The vault is a token account for every reflection asset, wrapped
    /// native included. Its token amount drives the accumulator and its
    /// lamports bound what a native claim can pay out.
    async fn vault_balance(&self, vault: &Pubkey) -> FetchResult<VaultBalance> {
        match self.read(vault).await? {
            Some(account) => Ok(VaultBalance {
                amount: token_amount(&account.data)?,
                lamports: account.lamports,
            }),
            None => {
                warn!(%vault, "Reflection vault does not exist, treating balance as zero");
                Ok(VaultBalance::default())
            }
        }
    }

    async fn read(&self, address: &Pubkey) -> LedgerResult<Option<LedgerAccount>> {
        let permit = self.scheduler.acquire().await;
        debug!(%address, permit = permit.sequence, "Reading account");
        self.ledger.get_account(address).await
    }
}

fn now() -> UnixTimestamp {
    chrono::Utc::now().timestamp()
}
