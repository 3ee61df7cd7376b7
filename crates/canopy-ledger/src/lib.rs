//! Append-only token ledger for the Canopy simulation.
//!
//! Every event that changes a player's token balance -- selling a harvest,
//! buying a seed, a level-up bonus, an achievement reward, a direct grant --
//! appends one [`GameTransaction`] to this ledger. Entries are never
//! modified or deleted. The ledger, not the mutable balance on the player
//! row, is the source of truth for "tokens earned" totals.
//!
//! # Architecture
//!
//! - [`ledger`] -- The [`Ledger`] struct: append-only log with recording
//!   helpers and per-player aggregate queries.
//! - [`transaction`] -- The [`TransactionBuilder`] for validated entry
//!   construction.
//! - [`reconcile`] -- Balance audit: opening balance plus ledger net must
//!   equal the live balance.
//!
//! # Sign Convention
//!
//! | Type | Amount |
//! |------|--------|
//! | `plant_sale` | positive |
//! | `token_purchase` | positive |
//! | `achievement_reward` | positive |
//! | `level_up_bonus` | positive |
//! | `seed_purchase` | negative |
//!
//! # Usage
//!
//! ```
//! use canopy_ledger::Ledger;
//! use canopy_types::{PlayerId, SaleId};
//! use chrono::Utc;
//!
//! let mut ledger = Ledger::new();
//! let player = PlayerId::new();
//!
//! ledger.record_sale(player, 120, SaleId::new(), Utc::now()).ok();
//! ledger.record_seed_purchase(player, 25, None, Utc::now()).ok();
//!
//! assert_eq!(ledger.tokens_earned(player), 120);
//! assert_eq!(ledger.entries_for_player(player).len(), 2);
//! ```
//!
//! [`GameTransaction`]: canopy_types::GameTransaction

pub mod ledger;
pub mod reconcile;
pub mod transaction;

// Re-export primary types at crate root.
pub use ledger::{Ledger, RecordParams};
pub use reconcile::{BalanceAnomaly, ReconcileResult};
pub use transaction::TransactionBuilder;

use canopy_types::TransactionType;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when recording ledger entries.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A ledger entry must move at least one token.
    #[error("ledger entry amount must be non-zero")]
    ZeroAmount,

    /// The amount's sign does not match the entry type (spends are negative,
    /// everything else positive).
    #[error("amount {amount} has the wrong sign for {transaction_type:?}")]
    SignMismatch {
        /// The entry type being validated.
        transaction_type: TransactionType,
        /// The offending amount.
        amount: i64,
    },

    /// The token count does not fit the signed ledger amount.
    #[error("token amount {0} exceeds the ledger range")]
    AmountOutOfRange(u64),

    /// A required field was not set on the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// An internal error that should not occur in normal operation.
    #[error("internal ledger error: {0}")]
    InternalError(&'static str),
}
