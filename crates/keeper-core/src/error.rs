use thiserror::Error;

/// Top-level error type for the keeper workspace.
///
/// Subsystem crates define their own error types and convert into this one
/// at the binary boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeeperError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for KeeperError {
    fn from(err: toml::de::Error) -> Self {
        KeeperError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for KeeperError {
    fn from(err: toml::ser::Error) -> Self {
        KeeperError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for KeeperError {
    fn from(err: serde_json::Error) -> Self {
        KeeperError::Serialization(err.to_string())
    }
}

/// Failures reported by the ledger client or a principal group.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Ledger handle unavailable")]
    Unavailable,
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Transaction rejected: {0}")]
    Rejected(String),
}

/// Failures reported by the delayed-action store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Corrupt row: {0}")]
    Corrupt(String),
    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

/// A specialized `Result` type for keeper operations.
pub type Result<T> = std::result::Result<T, KeeperError>;
