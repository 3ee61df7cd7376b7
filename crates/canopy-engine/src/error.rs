//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every subsystem failure the engine can hit while
//! booting or persisting.

use canopy_core::{ConfigError, GameError, StoreError};
use canopy_db::{DbError, PersistError};

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// Connecting to or migrating `PostgreSQL` failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: DbError,
    },

    /// Flushing or loading the world failed.
    #[error("persistence error: {source}")]
    Persist {
        /// The underlying persistence error.
        #[from]
        source: PersistError,
    },

    /// The in-memory store refused an operation.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// Seeding the catalog failed.
    #[error("game error: {source}")]
    Game {
        /// The underlying game error.
        #[from]
        source: GameError,
    },

    /// Installing the shutdown signal handler failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
