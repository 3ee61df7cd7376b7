//! Error types for the `canopy-players` crate.

use canopy_types::Stage;

/// Errors that can occur while mutating a player's progression.
#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    /// A spend exceeds the player's balance. Nothing was changed.
    #[error("insufficient funds: need {required} tokens, have {available}")]
    InsufficientFunds {
        /// Tokens the operation needs.
        required: u64,
        /// Tokens the player holds.
        available: u64,
    },

    /// The plant is not in a sellable state.
    #[error("plant is {stage}, only harvested plants can be sold")]
    NotSellable {
        /// The plant's current stage.
        stage: Stage,
    },

    /// A harvested plant is missing its fixed weight or quality.
    #[error("harvested plant has no recorded {0}")]
    MissingHarvestFigure(&'static str),

    /// An arithmetic overflow occurred during a progression computation.
    #[error("arithmetic overflow in progression computation: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: &'static str,
    },
}
