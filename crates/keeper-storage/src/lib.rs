//! Keeper storage crate - SQLite persistence for the delayed-action queue.
//!
//! Provides a WAL-mode SQLite database with migrations, repositories for
//! queued actions, execution history and candidate names, and
//! [`SqliteStore`], the `ActionStore` implementation used by the binary.

pub mod db;
pub mod migrations;
pub mod repository;
pub mod store;

pub use db::Database;
pub use repository::{CandidateRepository, DelayedActionRepository, ExecutionRepository};
pub use store::SqliteStore;
