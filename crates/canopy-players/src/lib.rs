//! Player-facing economy rules for the Canopy simulation.
//!
//! This crate sits between the pure world rules (`canopy-world`) and the
//! service layer (`canopy-core`). It knows how a player's balance,
//! experience and reputation change, what a harvest sells for, and when an
//! achievement is earned, but it never touches storage.

pub mod achievement;
pub mod error;
pub mod progression;
pub mod sale;

// Re-export primary types at crate root for convenience.
pub use achievement::{AchievementProgress, is_met, newly_met};
pub use error::ProgressionError;
pub use progression::{
    DEFAULT_STARTING_REPUTATION, DEFAULT_STARTING_TOKENS, LEVEL_UP_BONUS, LevelUp, XP_PER_LEVEL,
    adjust_reputation, apply_experience, credit_tokens, debit_tokens, level_for_experience,
    new_player, unlock_location,
};
pub use sale::{BASE_PRICE_PER_GRAM, SaleQuote, quote, to_sale};
