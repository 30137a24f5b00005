//! Shared domain types, configuration and collaborator contracts for the
//! keeper workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod ports;
pub mod types;

pub use config::{KeeperConfig, ScanFrequency};
pub use error::{KeeperError, LedgerError, Result, StoreError};
pub use events::{ProgressEvent, BATCH_COMPLETE};
pub use ports::{ActionStore, ChainClient, Notifier, PrincipalGroup, ProgressSink};
pub use types::*;
