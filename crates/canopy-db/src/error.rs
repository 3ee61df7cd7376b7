//! Error types for the persistence layer.
//!
//! Store operations return [`DbError`], which wraps the underlying
//! [`sqlx`] errors and the row conversions that can fail between Rust and
//! `PostgreSQL` column types.

/// Errors that can occur in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An enum label could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A numeric value does not fit the column or field type.
    #[error("value out of range for {column}: {value}")]
    OutOfRange {
        /// Column being converted.
        column: &'static str,
        /// The offending value, rendered.
        value: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
