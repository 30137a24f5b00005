//! Keeper application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Open the SQLite queue
//! 3. Build the ledger, principal groups, notifier and engine
//! 4. Dispatch the requested subcommand

mod cli;
mod ledger;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use keeper_core::config::KeeperConfig;
use keeper_core::ports::{ActionStore, Notifier, PrincipalGroup};
use keeper_core::types::{Address, CallHash, DelayedAction};
use keeper_core::ScanFrequency;
use keeper_engine::{
    Engine, EngineConfig, GroupRegistry, LogNotifier, NoopNotifier, RateLimitedNotifier,
    Scheduler, TracingProgressSink,
};
use keeper_storage::SqliteStore;

use cli::{CliArgs, Command};
use ledger::SnapshotLedger;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if let Some(rest) = data_dir.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(data_dir)
    }
}

fn load_config(path: &Path) -> keeper_core::Result<Option<KeeperConfig>> {
    if path.exists() {
        KeeperConfig::load(path).map(Some)
    } else {
        Ok(None)
    }
}

fn build_notifier(config: &KeeperConfig) -> Arc<dyn Notifier> {
    if config.notifier.enabled {
        Arc::new(RateLimitedNotifier::new(
            Arc::new(LogNotifier::default()),
            config.notifier.max_per_minute,
        ))
    } else {
        Arc::new(NoopNotifier)
    }
}

fn build_engine(
    config: &KeeperConfig,
    ledger_path: &Path,
    store: Arc<SqliteStore>,
) -> Result<Engine, Box<dyn std::error::Error>> {
    let ledger = Arc::new(SnapshotLedger::open(ledger_path)?);

    let groups: GroupRegistry = config
        .groups
        .iter()
        .map(|g| Arc::new(ledger.group(g)) as Arc<dyn PrincipalGroup>)
        .collect();
    if groups.is_empty() {
        tracing::warn!("No principal groups configured; every queued action will be skipped");
    }

    let engine_config = EngineConfig::from_config(config);
    tracing::info!(
        delay_blocks = engine_config.delay_blocks,
        threshold = %engine_config.commission_threshold,
        groups = groups.len(),
        "Engine configured"
    );

    Ok(Engine::new(ledger, store, groups, engine_config)
        .with_progress(Arc::new(TracingProgressSink))
        .with_notifier(build_notifier(config)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let loaded = load_config(&config_file);

    let log_level = args
        .resolve_log_level()
        .or_else(|| {
            loaded
                .as_ref()
                .ok()
                .and_then(|c| c.as_ref())
                .map(|c| c.general.log_level.clone())
        })
        .unwrap_or_else(|| "info".to_string());

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting keeper v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let mut config = match loaded {
        Ok(Some(config)) => {
            tracing::info!(path = %config_file.display(), "Configuration loaded");
            config
        }
        Ok(None) => {
            tracing::info!(path = %config_file.display(), "No configuration file, using defaults");
            KeeperConfig::default()
        }
        Err(e) => {
            tracing::error!(path = %config_file.display(), error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join("keeper.db");
    let store = Arc::new(SqliteStore::open(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let ledger_path = args.resolve_ledger_path(&data_dir);

    match args.command {
        Command::Enqueue {
            block,
            controller,
            principal,
            hash,
            targets,
        } => {
            let controller = Address::new(controller);
            let principal = match principal {
                Some(p) => Address::new(p),
                None => config
                    .groups
                    .iter()
                    .find(|g| g.controller == controller)
                    .map(|g| g.principal.clone())
                    .ok_or_else(|| {
                        format!("no configured group for {}; pass --principal", controller)
                    })?,
            };
            let action = DelayedAction {
                announced_block: block,
                principal,
                controller,
                targets: targets.into_iter().map(Address::new).collect(),
                action_hash: CallHash::new(hash),
            };
            store.enqueue(&action)?;
            tracing::info!(key = %action.key(), targets = action.targets.len(), "Action queued");
        }
        Command::Queue => {
            print_json(&store.pending_actions()?)?;
        }
        Command::History { controller, limit } => {
            let controller = controller.map(Address::new);
            print_json(&store.executions.list(controller.as_ref(), limit)?)?;
        }
        Command::Candidate { address, name } => {
            store.candidates.upsert(&Address::new(address), &name)?;
        }
        Command::Plan => {
            let engine = build_engine(&config, &ledger_path, store)?;
            print_json(&engine.plan().await?)?;
        }
        Command::Scan => {
            let engine = build_engine(&config, &ledger_path, store)?;
            match engine.run_tick().await? {
                keeper_engine::TickOutcome::Completed(report) => print_json(&report)?,
                keeper_engine::TickOutcome::AlreadyRunning => {
                    tracing::warn!("Another scan is already running")
                }
            }
        }
        Command::Run => {
            let frequency: ScanFrequency = config.scan.scan_frequency.parse()?;
            let engine = Arc::new(build_engine(&config, &ledger_path, store)?);
            let scheduler = Arc::new(Scheduler::new(engine, frequency.as_duration()));

            let runner = {
                let scheduler = Arc::clone(&scheduler);
                tokio::spawn(async move { scheduler.run().await })
            };

            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutdown requested, waiting for the current scan to finish");
            scheduler.shutdown();
            runner.await?;
        }
    }

    Ok(())
}
