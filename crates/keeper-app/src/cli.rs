//! CLI argument definitions for the keeper binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Keeper: executes or cancels time-delayed proxy nominations.
#[derive(Parser, Debug)]
#[command(name = "keeper", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding the SQLite queue.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Ledger snapshot file (defaults to `<data-dir>/ledger.json`).
    #[arg(long = "ledger", global = true)]
    pub ledger: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Scan on the configured frequency until interrupted.
    Run,
    /// Run a single scan and print its report.
    Scan,
    /// Classify every queued action without acting on it.
    Plan,
    /// Queue an announced nomination.
    Enqueue {
        /// Block the announcement was made at.
        #[arg(long)]
        block: u64,
        /// Controller (proxy) account that announced the call.
        #[arg(long)]
        controller: String,
        /// Principal (stash) account. Defaults to the configured group's.
        #[arg(long)]
        principal: Option<String>,
        /// Call hash of the announced nomination.
        #[arg(long)]
        hash: String,
        /// Validator to nominate; repeat for each target.
        #[arg(long = "target", required = true)]
        targets: Vec<String>,
    },
    /// List queued actions.
    Queue,
    /// Show executed nominations, newest first.
    History {
        #[arg(long)]
        controller: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },
    /// Set the display name of a validator.
    Candidate { address: String, name: String },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > KEEPER_CONFIG env var > ~/.keeper/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("KEEPER_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the data directory path.
    ///
    /// Priority: --data-dir flag > config file value.
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }

    /// Resolve the ledger snapshot path.
    pub fn resolve_ledger_path(&self, data_dir: &Path) -> PathBuf {
        self.ledger
            .clone()
            .unwrap_or_else(|| data_dir.join("ledger.json"))
    }
}

/// Default config file path.
fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".keeper").join("config.toml");
    }
    PathBuf::from("config.toml")
}
