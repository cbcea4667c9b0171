//! On-chain layouts of the staking program's accounts.
//!
//! Accounts are Anchor-encoded: an 8 byte discriminator (`sha256("account:<Name>")[..8]`)
//! followed by the borsh-serialized fields. Public keys are kept as raw
//! byte arrays and converted at the edge.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{hash::hash, pubkey::Pubkey};
use spl_token::solana_program::program_pack::Pack;
use stakesync_core::{PauseFlags, PoolSnapshot, RateMode, StakeSnapshot, UnixTimestamp};

use crate::error::{LedgerError, LedgerResult};

pub const PROJECT_ACCOUNT: &str = "Project";
pub const STAKE_ACCOUNT: &str = "Stake";

const DISCRIMINATOR_LEN: usize = 8;

pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = hash(format!("account:{}", name).as_bytes()).to_bytes();
    let mut discriminator = [0u8; DISCRIMINATOR_LEN];
    discriminator.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    discriminator
}

/// Decodes an Anchor account, tolerating trailing padding
pub fn decode_account<T: BorshDeserialize>(name: &str, data: &[u8]) -> LedgerResult<T> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(LedgerError::decode(name, format!("{} bytes is too short", data.len())));
    }
    if data[..DISCRIMINATOR_LEN] != account_discriminator(name) {
        return Err(LedgerError::decode(name, "discriminator mismatch"));
    }
    let mut body = &data[DISCRIMINATOR_LEN..];
    T::deserialize(&mut body).map_err(|e| LedgerError::decode(name, e))
}

/// Encodes an Anchor account with its discriminator
pub fn encode_account<T: BorshSerialize>(name: &str, account: &T) -> LedgerResult<Vec<u8>> {
    let mut data = account_discriminator(name).to_vec();
    account
        .serialize(&mut data)
        .map_err(|e| LedgerError::decode(name, e))?;
    Ok(data)
}

/// Pool record, one per (mint, pool id)
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectAccount {
    pub admin: [u8; 32],
    pub token_mint: [u8; 32],
    pub pool_id: u64,
    pub staking_vault: [u8; 32],
    pub reward_vault: [u8; 32],
    pub reflection_vault: Option<[u8; 32]>,
    pub reflection_token: Option<[u8; 32]>,
    pub total_staked: u64,
    pub total_rewards_deposited: u64,
    pub total_rewards_claimed: u64,
    pub rate_bps_per_year: u64,
    pub rate_mode: u8,
    pub reward_rate_per_second: u64,
    pub lockup_seconds: u64,
    pub pool_duration_seconds: u64,
    pub pool_start_time: i64,
    pub pool_end_time: i64,
    pub last_update_time: i64,
    pub reward_per_token_stored: u64,
    pub reflection_per_token_stored: u64,
    pub last_reflection_update_time: i64,
    pub last_reflection_balance: u64,
    pub referrer: Option<[u8; 32]>,
    pub referrer_split_bps: u64,
    pub is_paused: bool,
    pub deposit_paused: bool,
    pub withdraw_paused: bool,
    pub claim_paused: bool,
    pub is_initialized: bool,
    pub bump: u8,
    pub total_reflection_debt: u64,
}

impl ProjectAccount {
    pub fn token_mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.token_mint)
    }

    pub fn reflection_vault(&self) -> Option<Pubkey> {
        self.reflection_vault.map(Pubkey::new_from_array)
    }

    pub fn reflection_token(&self) -> Option<Pubkey> {
        self.reflection_token.map(Pubkey::new_from_array)
    }

    pub fn reflections_enabled(&self) -> bool {
        self.reflection_vault.is_some()
    }

    pub fn is_native_reflection(&self) -> bool {
        self.reflection_token() == Some(spl_token::native_mint::id())
    }

    pub fn pause_flags(&self) -> PauseFlags {
        PauseFlags {
            deposits: self.deposit_paused,
            withdrawals: self.withdraw_paused,
            claims: self.claim_paused,
            all: self.is_paused,
        }
    }

    pub fn into_snapshot(
        self,
        token_decimals: u8,
        reflection_decimals: u8,
        reflection_vault: Option<VaultBalance>,
        captured_at: UnixTimestamp,
    ) -> PoolSnapshot {
        PoolSnapshot {
            rate_bps_per_year: self.rate_bps_per_year,
            rate_mode: RateMode::from_onchain(self.rate_mode),
            reward_rate_per_second: self.reward_rate_per_second,
            lockup_seconds: self.lockup_seconds,
            pool_duration_seconds: self.pool_duration_seconds,
            pool_start_time: self.pool_start_time,
            pool_end_time: self.pool_end_time,
            last_update_time: self.last_update_time,
            total_staked: self.total_staked as u128,
            token_decimals,
            reward_per_token_accumulated: self.reward_per_token_stored as u128,
            reflection_per_token_accumulated: self.reflection_per_token_stored as u128,
            reflections_enabled: self.reflections_enabled(),
            reflection_asset_is_native: self.is_native_reflection(),
            reflection_decimals,
            reflection_vault_balance: reflection_vault.map(|vault| vault.amount as u128),
            reflection_vault_lamports: reflection_vault.map(|vault| vault.lamports as u128),
            last_reflection_balance: self.last_reflection_balance as u128,
            paused: self.pause_flags(),
            captured_at,
        }
    }
}

/// Reflection vault as read from the ledger. For a wrapped native vault
/// `lamports` exceeds `amount` by the account's rent reserve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaultBalance {
    /// Token amount, the figure the program folds into its accumulator
    pub amount: u64,
    pub lamports: u64,
}

/// Per-wallet stake record
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct StakeAccount {
    pub user: [u8; 32],
    pub project: [u8; 32],
    pub amount: u64,
    pub last_stake_timestamp: i64,
    pub withdrawal_wallet: [u8; 32],
    pub reward_per_token_paid: u64,
    pub rewards_pending: u64,
    pub total_rewards_claimed: u64,
    pub reflection_per_token_paid: u64,
    pub reflections_pending: u64,
    pub total_reflections_claimed: u64,
    pub reflection_debt: u64,
    pub reward_rate_snapshot: u64,
    pub bump: u8,
}

impl StakeAccount {
    pub fn into_snapshot(self, captured_at: UnixTimestamp) -> StakeSnapshot {
        StakeSnapshot {
            staked_amount: self.amount as u128,
            last_stake_timestamp: self.last_stake_timestamp,
            reward_per_token_paid: self.reward_per_token_paid as u128,
            pending_reward_at_last_checkpoint: self.rewards_pending as u128,
            reflection_per_token_paid: self.reflection_per_token_paid as u128,
            pending_reflection_at_last_checkpoint: self.reflections_pending as u128,
            reflection_debt: self.reflection_debt as u128,
            captured_at,
        }
    }
}

/// Amount held by an SPL token account (legacy or Token-2022 base layout)
pub fn token_amount(data: &[u8]) -> LedgerResult<u64> {
    let len = spl_token::state::Account::LEN;
    if data.len() < len {
        return Err(LedgerError::decode("TokenAccount", format!("{} bytes is too short", data.len())));
    }
    spl_token::state::Account::unpack_unchecked(&data[..len])
        .map(|account| account.amount)
        .map_err(|e| LedgerError::decode("TokenAccount", e))
}

/// Decimals of an SPL mint (legacy or Token-2022 base layout)
pub fn mint_decimals(data: &[u8]) -> LedgerResult<u8> {
    let len = spl_token::state::Mint::LEN;
    if data.len() < len {
        return Err(LedgerError::decode("Mint", format!("{} bytes is too short", data.len())));
    }
    spl_token::state::Mint::unpack_unchecked(&data[..len])
        .map(|mint| mint.decimals)
        .map_err(|e| LedgerError::decode("Mint", e))
}
