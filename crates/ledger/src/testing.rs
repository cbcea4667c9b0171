//! In-memory ledger and submitter for tests
//!
//! [`MockLedger`] stores raw accounts and transaction statuses and can be
//! told to fail reads. [`MockSubmitter`] replays scripted outcomes and
//! records every submission. Both are usable from dependent crates through
//! the `testing` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use spl_token::solana_program::{program_option::COption, program_pack::Pack};
use spl_associated_token_account::get_associated_token_address_with_program_id;
use stakesync_core::Action;

use crate::accounts::{encode_account, ProjectAccount, StakeAccount, PROJECT_ACCOUNT, STAKE_ACCOUNT};
use crate::entity::EntityKey;
use crate::error::{LedgerError, LedgerResult, SubmitError};
use crate::ledger::{ActionSubmitter, Ledger, LedgerAccount, SignatureOutcome};
use crate::pda::PdaBuilder;

/// Rent-exempt balance used for fixture accounts
pub const FIXTURE_LAMPORTS: u64 = 2_039_280;

#[derive(Default)]
pub struct MockLedger {
    accounts: Mutex<HashMap<Pubkey, LedgerAccount>>,
    statuses: Mutex<HashMap<Signature, SignatureOutcome>>,
    fail_reads: AtomicBool,
    fail_status: AtomicBool,
    reads: Mutex<Vec<Pubkey>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_account(&self, address: Pubkey, account: LedgerAccount) {
        self.accounts.lock().unwrap().insert(address, account);
    }

    pub fn remove_account(&self, address: &Pubkey) {
        self.accounts.lock().unwrap().remove(address);
    }

    /// Store a pool record at its PDA and return the address
    pub fn set_project(&self, program_id: &Pubkey, project: &ProjectAccount) -> Pubkey {
        let pdas = PdaBuilder::new(*program_id);
        let (address, _) = pdas.project(&project.token_mint(), project.pool_id);
        let data = encode_account(PROJECT_ACCOUNT, project).unwrap();
        self.set_account(address, LedgerAccount { lamports: FIXTURE_LAMPORTS, owner: *program_id, data });
        address
    }

    /// Store a stake record at its PDA and return the address
    pub fn set_stake(&self, program_id: &Pubkey, project: &Pubkey, wallet: &Pubkey, stake: &StakeAccount) -> Pubkey {
        let pdas = PdaBuilder::new(*program_id);
        let (address, _) = pdas.stake(project, wallet);
        let data = encode_account(STAKE_ACCOUNT, stake).unwrap();
        self.set_account(address, LedgerAccount { lamports: FIXTURE_LAMPORTS, owner: *program_id, data });
        address
    }

    pub fn set_mint(&self, mint: &Pubkey, decimals: u8) {
        let state = spl_token::state::Mint {
            mint_authority: COption::None,
            supply: 0,
            decimals,
            is_initialized: true,
            freeze_authority: COption::None,
        };
        let mut data = vec![0u8; spl_token::state::Mint::LEN];
        spl_token::state::Mint::pack(state, &mut data).unwrap();
        self.set_account(*mint, LedgerAccount { lamports: FIXTURE_LAMPORTS, owner: spl_token::id(), data });
    }

    pub fn set_token_account(&self, address: &Pubkey, mint: &Pubkey, owner: &Pubkey, amount: u64) {
        let state = spl_token::state::Account {
            mint: *mint,
            owner: *owner,
            amount,
            delegate: COption::None,
            state: spl_token::state::AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        };
        let mut data = vec![0u8; spl_token::state::Account::LEN];
        spl_token::state::Account::pack(state, &mut data).unwrap();
        self.set_account(*address, LedgerAccount { lamports: FIXTURE_LAMPORTS, owner: spl_token::id(), data });
    }

    /// Fund the wallet's associated token account for `mint`
    pub fn set_wallet_balance(&self, wallet: &Pubkey, mint: &Pubkey, amount: u64) -> Pubkey {
        let ata = get_associated_token_address_with_program_id(wallet, mint, &spl_token::id());
        self.set_token_account(&ata, mint, wallet, amount);
        ata
    }

    /// Wrapped native vault holding `amount` lamports on top of its rent
    /// reserve, as the token program lays it out
    pub fn set_native_vault(&self, address: &Pubkey, owner: &Pubkey, amount: u64) {
        let state = spl_token::state::Account {
            mint: spl_token::native_mint::id(),
            owner: *owner,
            amount,
            delegate: COption::None,
            state: spl_token::state::AccountState::Initialized,
            is_native: COption::Some(FIXTURE_LAMPORTS),
            delegated_amount: 0,
            close_authority: COption::None,
        };
        let mut data = vec![0u8; spl_token::state::Account::LEN];
        spl_token::state::Account::pack(state, &mut data).unwrap();
        self.set_account(
            *address,
            LedgerAccount { lamports: amount + FIXTURE_LAMPORTS, owner: spl_token::id(), data },
        );
    }

    pub fn set_signature_status(&self, signature: Signature, outcome: SignatureOutcome) {
        self.statuses.lock().unwrap().insert(signature, outcome);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_status_queries(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    /// Addresses read so far, in order
    pub fn reads(&self) -> Vec<Pubkey> {
        self.reads.lock().unwrap().clone()
    }

    pub fn read_count(&self) -> usize {
        self.reads.lock().unwrap().len()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn get_account(&self, address: &Pubkey) -> LedgerResult<Option<LedgerAccount>> {
        self.reads.lock().unwrap().push(*address);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("429 Too Many Requests".to_string()));
        }
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn signature_status(&self, signature: &Signature) -> LedgerResult<Option<SignatureOutcome>> {
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("connection reset".to_string()));
        }
        Ok(self.statuses.lock().unwrap().get(signature).cloned())
    }
}

/// Scripted [`ActionSubmitter`]. With an empty script every submission
/// succeeds with a fresh signature.
#[derive(Default)]
pub struct MockSubmitter {
    script: Mutex<VecDeque<Result<Signature, SubmitError>>>,
    submissions: Mutex<Vec<(EntityKey, Action)>>,
    delay_ms: AtomicU64,
    counter: AtomicUsize,
}

impl MockSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, result: Result<Signature, SubmitError>) {
        self.script.lock().unwrap().push_back(result);
    }

    /// Hold every submission for `delay` before answering
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<(EntityKey, Action)> {
        self.submissions.lock().unwrap().clone()
    }

    /// Deterministic distinct signature
    pub fn next_signature(&self) -> Signature {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) as u8;
        Signature::from([n.wrapping_add(1); 64])
    }
}

#[async_trait]
impl ActionSubmitter for MockSubmitter {
    async fn submit(&self, entity: &EntityKey, action: &Action) -> Result<Signature, SubmitError> {
        self.submissions.lock().unwrap().push((*entity, action.clone()));

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(result) => result,
            None => Ok(self.next_signature()),
        }
    }
}
