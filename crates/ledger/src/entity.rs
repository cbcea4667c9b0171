use std::fmt;

use solana_sdk::pubkey::Pubkey;

/// One pool as seen by one wallet. `wallet` is `None` while no wallet is
/// connected, in which case only the pool record is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub token_mint: Pubkey,
    pub pool_id: u64,
    pub wallet: Option<Pubkey>,
}

impl EntityKey {
    pub fn new(token_mint: Pubkey, pool_id: u64, wallet: Option<Pubkey>) -> Self {
        Self { token_mint, pool_id, wallet }
    }

    pub fn pool(token_mint: Pubkey, pool_id: u64) -> Self {
        Self::new(token_mint, pool_id, None)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.wallet {
            Some(wallet) => write!(f, "{}#{}@{}", self.token_mint, self.pool_id, wallet),
            None => write!(f, "{}#{}", self.token_mint, self.pool_id),
        }
    }
}
