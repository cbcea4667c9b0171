use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use stakesync_core::{EntityView, SyncedState};
use stakesync_ledger::{EntityKey, RpcLedger};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stakesync::config::create_example_config;
use stakesync::{PoolWatcher, ReadOnlySubmitter, SyncConfig};

#[derive(Parser, Debug)]
#[command(name = "stakesync")]
#[command(about = "Staking pool watcher with live reward accrual")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "stakesync.toml")]
    config: String,

    /// Override the RPC URL from the configuration
    #[arg(short, long)]
    rpc_url: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override log level
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Fetch every pool once, print the views as JSON and exit
    #[arg(long)]
    once: bool,

    /// Write an example configuration to --config and exit
    #[arg(long)]
    init_config: bool,
}

#[derive(Serialize)]
struct PoolReport<'a> {
    name: &'a str,
    entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    view: Option<EntityView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    if args.init_config {
        if Path::new(&args.config).exists() {
            anyhow::bail!("{} already exists, refusing to overwrite", args.config);
        }
        create_example_config(&args.config)?;
        info!("Wrote example configuration to {}", args.config);
        return Ok(());
    }

    let mut config = SyncConfig::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;
    if let Some(rpc_url) = args.rpc_url {
        config.rpc_url = rpc_url;
    }

    info!("Starting stakesync");
    info!("RPC URL: {}", config.rpc_url);
    info!("Program ID: {}", config.program_id);
    info!("Read spacing: {}ms", config.scheduler.min_interval_ms);

    let ledger = Arc::new(RpcLedger::new(config.rpc_url.clone(), config.commitment_config()?));
    let mut watcher = PoolWatcher::from_config(&config, ledger, Arc::new(ReadOnlySubmitter));

    if args.once {
        return report_once(&config, &watcher).await;
    }

    let pools = config.enabled_pools();
    if pools.is_empty() {
        warn!("No enabled pools in configuration, nothing to watch");
        return Ok(());
    }
    let names: Vec<(EntityKey, String)> = pools.iter().map(|p| (p.entity_key(), p.name.clone())).collect();
    for (key, _) in &names {
        watcher.watch(*key);
    }
    info!("Watching {} pools. Press Ctrl+C to shutdown.", watcher.len());

    let mut ticker = tokio::time::interval(Duration::from_secs(config.reconcile.tick_interval_secs));
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            _ = ticker.tick() => log_views(&watcher, &names),
        }
    }

    for (key, _) in &names {
        watcher.unwatch(key);
    }
    info!("Shutting down stakesync");
    Ok(())
}

fn log_views(watcher: &PoolWatcher, names: &[(EntityKey, String)]) {
    for (key, name) in names {
        let Some(handle) = watcher.handle(key) else {
            continue;
        };
        match handle.view() {
            Some(view) => info!(
                pool = %name,
                reward = %view.displayed_reward,
                reflection = %view.displayed_reflection,
                rate_percent = %view.derived_rate_percent,
                staked = %view.staked_amount,
                locked = view.is_locked,
                unlock_in_seconds = view.unlock_in_seconds,
                ended = view.pool_has_ended,
                stale = view.last_fetch_failed,
                "Pool view"
            ),
            None => match handle.status().last_error {
                Some(err) => warn!(pool = %name, error = %err, "Pool not loaded yet"),
                None => info!(pool = %name, "Waiting for first snapshot"),
            },
        }
    }
}

async fn report_once(config: &SyncConfig, watcher: &PoolWatcher) -> Result<()> {
    let mut reports = Vec::new();

    for pool in config.enabled_pools() {
        let key = pool.entity_key();
        let report = match watcher.fetcher().fetch(&key).await {
            Ok((snapshot, stake)) => {
                let now = chrono::Utc::now().timestamp();
                let state = SyncedState::new(snapshot, stake, now);
                let view = EntityView::derive(&state, now, config.native_vault_buffer(), false);
                PoolReport { name: &pool.name, entity: key.to_string(), view: Some(view), error: None }
            }
            Err(err) => {
                error!(pool = %pool.name, error = %err, "Failed to fetch pool");
                PoolReport { name: &pool.name, entity: key.to_string(), view: None, error: Some(err.to_string()) }
            }
        };
        reports.push(report);
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

fn init_logging(args: &Args) {
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| if args.verbose { "debug" } else { "info" }.to_string());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("stakesync={level},stakesync_ledger={level},stakesync_core={level}").into());

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
