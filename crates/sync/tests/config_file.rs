//! Configuration files on disk.

use std::fs;

use solana_sdk::pubkey::Pubkey;
use stakesync::config::create_example_config;
use stakesync::{PoolConfig, SyncConfig, SyncError};
use tempfile::tempdir;

#[test]
fn save_then_load_preserves_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stakesync.toml");

    let mut config = SyncConfig::default();
    config.reconcile.tick_interval_secs = 5;
    config.reflection.native_vault_buffer_lamports = 5_000_000;
    config.pools.push(PoolConfig {
        name: "tracked".to_string(),
        token_mint: Pubkey::new_unique(),
        pool_id: 2,
        wallet: Some(Pubkey::new_unique()),
        enabled: true,
    });
    config.pools.push(PoolConfig {
        name: "pool only".to_string(),
        token_mint: Pubkey::new_unique(),
        pool_id: 0,
        wallet: None,
        enabled: false,
    });

    config.save(&path).unwrap();
    let loaded = SyncConfig::load(&path).unwrap();

    assert_eq!(loaded, config);
    assert_eq!(loaded.enabled_pools().len(), 1);
    assert_eq!(loaded.native_vault_buffer(), 5_000_000);
}

#[test]
fn example_config_is_valid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("example.toml");

    create_example_config(&path).unwrap();
    let config = SyncConfig::load(&path).unwrap();

    assert_eq!(config.pools.len(), 2);
    assert!(config.pools[1].wallet.is_some());
}

#[test]
fn invalid_files_are_reported() {
    let dir = tempdir().unwrap();

    let missing = dir.path().join("missing.toml");
    assert!(matches!(SyncConfig::load(&missing), Err(SyncError::Io { .. })));

    let garbage = dir.path().join("garbage.toml");
    fs::write(&garbage, "rpc_url = [").unwrap();
    assert!(matches!(SyncConfig::load(&garbage), Err(SyncError::Parse(_))));

    let no_pools = dir.path().join("empty.toml");
    fs::write(&no_pools, "rpc_url = \"http://localhost:8899\"\n").unwrap();
    assert!(matches!(SyncConfig::load(&no_pools), Err(SyncError::InvalidConfig(_))));

    let bad_key = dir.path().join("bad_key.toml");
    fs::write(
        &bad_key,
        "rpc_url = \"http://localhost:8899\"\n\n[[pools]]\nname = \"x\"\ntoken_mint = \"not-a-key\"\n",
    )
    .unwrap();
    assert!(matches!(SyncConfig::load(&bad_key), Err(SyncError::Parse(_))));
}
