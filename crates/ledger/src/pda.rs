use std::collections::HashMap;
use std::sync::RwLock;

use solana_sdk::pubkey::Pubkey;

/// Seeds of the staking program's PDAs
pub mod seeds {
    pub const PROJECT: &[u8] = b"project";
    pub const STAKE: &[u8] = b"stake";
}

/// PDA cache to avoid recomputing addresses
pub struct PdaCache {
    cache: RwLock<HashMap<String, (Pubkey, u8)>>,
}

impl PdaCache {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> (Pubkey, u8)
    where
        F: FnOnce() -> (Pubkey, u8),
    {
        if let Some(cached) = self.cache.read().ok().and_then(|cache| cache.get(key).copied()) {
            return cached;
        }

        let result = compute();
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key.to_string(), result);
        }
        result
    }
}

impl Default for PdaCache {
    fn default() -> Self {
        Self::new()
    }
}

/// PDA builder for the staking program's accounts
pub struct PdaBuilder {
    cache: PdaCache,
    pub program_id: Pubkey,
}

impl PdaBuilder {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            cache: PdaCache::new(),
            program_id,
        }
    }

    /// Pool record: `["project", mint, pool_id (u64 LE)]`
    pub fn project(&self, token_mint: &Pubkey, pool_id: u64) -> (Pubkey, u8) {
        let key = format!("project:{}:{}", token_mint, pool_id);
        self.cache.get_or_compute(&key, || {
            Pubkey::find_program_address(
                &[seeds::PROJECT, token_mint.as_ref(), &pool_id.to_le_bytes()],
                &self.program_id,
            )
        })
    }

    /// Stake record: `["stake", project, wallet]`
    pub fn stake(&self, project: &Pubkey, wallet: &Pubkey) -> (Pubkey, u8) {
        let key = format!("stake:{}:{}", project, wallet);
        self.cache.get_or_compute(&key, || {
            Pubkey::find_program_address(
                &[seeds::STAKE, project.as_ref(), wallet.as_ref()],
                &self.program_id,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_pda_depends_on_pool_id() {
        let pdas = PdaBuilder::new(Pubkey::new_unique());
        let mint = Pubkey::new_unique();

        let (first, _) = pdas.project(&mint, 0);
        let (second, _) = pdas.project(&mint, 1);
        assert_ne!(first, second);

        let expected = Pubkey::find_program_address(
            &[b"project", mint.as_ref(), &0u64.to_le_bytes()],
            &pdas.program_id,
        );
        assert_eq!(pdas.project(&mint, 0), expected);
    }

    #[test]
    fn test_cached_stake_pda_is_stable() {
        let pdas = PdaBuilder::new(Pubkey::new_unique());
        let project = Pubkey::new_unique();
        let wallet = Pubkey::new_unique();
        assert_eq!(pdas.stake(&project, &wallet), pdas.stake(&project, &wallet));
    }
}
