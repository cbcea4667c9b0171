use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use stakesync_core::DEFAULT_NATIVE_VAULT_BUFFER;
use stakesync_ledger::{EntityKey, DEFAULT_PROGRAM_ID};

use crate::error::{SyncError, SyncResult};
use crate::policy::{JitterPolicy, ReconcilePolicy};

/// Sync service configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SyncConfig {
    /// RPC endpoint of the cluster
    pub rpc_url: String,

    /// Commitment level for reads and status queries
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Staking program ID
    #[serde(with = "pubkey_serde", default = "default_program_id")]
    pub program_id: Pubkey,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default)]
    pub mutation: MutationConfig,

    #[serde(default)]
    pub reflection: ReflectionConfig,

    /// Pools to watch
    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

/// Process-wide read pacing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Minimum spacing between two ledger reads (milliseconds)
    pub min_interval_ms: u64,
}

/// Per-entity reconciliation timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReconcileConfig {
    /// Lower bound of the jittered refresh delay (seconds)
    pub min_interval_secs: u64,

    /// Upper bound of the jittered refresh delay (seconds)
    pub max_interval_secs: u64,

    /// Minimum spacing of manual refreshes (milliseconds)
    pub manual_refresh_cooldown_ms: u64,

    /// View recomputation period (seconds)
    pub tick_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MutationConfig {
    /// Minimum spacing of two actions on the same pool (milliseconds)
    pub action_cooldown_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReflectionConfig {
    /// Lamports a native reflection vault keeps for rent and fees
    pub native_vault_buffer_lamports: u64,
}

/// One watched pool
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Pool name for logging
    pub name: String,

    /// Staking token mint
    #[serde(with = "pubkey_serde")]
    pub token_mint: Pubkey,

    /// Pool index under the mint
    #[serde(default)]
    pub pool_id: u64,

    /// Wallet whose stake is tracked
    #[serde(default, with = "option_pubkey_serde", skip_serializing_if = "Option::is_none")]
    pub wallet: Option<Pubkey>,

    /// Whether this pool is watched
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl SyncConfig {
    /// Load configuration from TOML file
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SyncError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let config: SyncConfig = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> SyncResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| SyncError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SyncResult<()> {
        if self.rpc_url.is_empty() {
            return Err(SyncError::invalid("rpc_url", "\"\"", "non-empty URL"));
        }

        self.commitment_config()?;

        if self.pools.is_empty() {
            return Err(SyncError::invalid("pools", "empty", "at least one pool"));
        }

        if self.scheduler.min_interval_ms == 0 {
            return Err(SyncError::invalid("scheduler.min_interval_ms", 0, "greater than 0"));
        }

        self.reconcile.validate()?;

        for pool in &self.pools {
            pool.validate()?;
        }

        Ok(())
    }

    pub fn commitment_config(&self) -> SyncResult<CommitmentConfig> {
        CommitmentConfig::from_str(&self.commitment)
            .map_err(|_| SyncError::invalid("commitment", &self.commitment, "processed, confirmed or finalized"))
    }

    /// Get enabled pools
    pub fn enabled_pools(&self) -> Vec<&PoolConfig> {
        self.pools.iter().filter(|p| p.enabled).collect()
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler.min_interval_ms)
    }

    pub fn action_cooldown(&self) -> Duration {
        Duration::from_millis(self.mutation.action_cooldown_ms)
    }

    pub fn native_vault_buffer(&self) -> u128 {
        self.reflection.native_vault_buffer_lamports as u128
    }

    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            jitter: JitterPolicy::new(
                Duration::from_secs(self.reconcile.min_interval_secs),
                Duration::from_secs(self.reconcile.max_interval_secs),
            ),
            manual_refresh_cooldown: Duration::from_millis(self.reconcile.manual_refresh_cooldown_ms),
            tick_interval: Duration::from_secs(self.reconcile.tick_interval_secs),
            native_vault_buffer: self.native_vault_buffer(),
        }
    }
}

impl ReconcileConfig {
    fn validate(&self) -> SyncResult<()> {
        if self.min_interval_secs == 0 {
            return Err(SyncError::invalid("reconcile.min_interval_secs", 0, "greater than 0"));
        }

        if self.max_interval_secs < self.min_interval_secs {
            return Err(SyncError::invalid(
                "reconcile.max_interval_secs",
                self.max_interval_secs,
                &format!("at least min_interval_secs ({})", self.min_interval_secs),
            ));
        }

        if self.tick_interval_secs == 0 {
            return Err(SyncError::invalid("reconcile.tick_interval_secs", 0, "greater than 0"));
        }

        Ok(())
    }
}

impl PoolConfig {
    fn validate(&self) -> SyncResult<()> {
        if self.name.is_empty() {
            return Err(SyncError::invalid("pools.name", "\"\"", "non-empty string"));
        }

        if self.token_mint == Pubkey::default() {
            return Err(SyncError::invalid("pools.token_mint", self.token_mint, "a mint address"));
        }

        Ok(())
    }

    pub fn entity_key(&self) -> EntityKey {
        EntityKey::new(self.token_mint, self.pool_id, self.wallet)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: default_commitment(),
            program_id: DEFAULT_PROGRAM_ID,
            scheduler: SchedulerConfig::default(),
            reconcile: ReconcileConfig::default(),
            mutation: MutationConfig::default(),
            reflection: ReflectionConfig::default(),
            pools: vec![],
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { min_interval_ms: 2_000 }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 120,
            max_interval_secs: 150,
            manual_refresh_cooldown_ms: 3_000,
            tick_interval_secs: 10,
        }
    }
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self { action_cooldown_ms: 3_000 }
    }
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            native_vault_buffer_lamports: DEFAULT_NATIVE_VAULT_BUFFER as u64,
        }
    }
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_program_id() -> Pubkey {
    DEFAULT_PROGRAM_ID
}

fn default_enabled() -> bool {
    true
}

/// Create example configuration file
pub fn create_example_config(path: impl AsRef<Path>) -> SyncResult<()> {
    let example_config = SyncConfig {
        rpc_url: "https://api.devnet.solana.com".to_string(),
        pools: vec![
            PoolConfig {
                name: "SOL reflections".to_string(),
                token_mint: solana_sdk::pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
                pool_id: 0,
                wallet: None,
                enabled: true,
            },
            PoolConfig {
                name: "Locked pool".to_string(),
                token_mint: solana_sdk::pubkey!("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB"),
                pool_id: 1,
                wallet: Some(solana_sdk::pubkey!("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM")),
                enabled: false,
            },
        ],
        ..SyncConfig::default()
    };

    example_config.save(path)
}

// Custom serde module for Pubkey
mod pubkey_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(pubkey: &Pubkey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&pubkey.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Pubkey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(serde::de::Error::custom)
    }
}

mod option_pubkey_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(pubkey: &Option<Pubkey>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match pubkey {
            Some(pubkey) => serializer.serialize_some(&pubkey.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Pubkey>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| Pubkey::from_str(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
