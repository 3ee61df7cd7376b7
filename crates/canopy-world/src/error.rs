//! Error types for the `canopy-world` crate.

use canopy_types::{Stage, StrainId};

/// Errors raised by the simulation rules.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A strain row has a ranged pair with `min > max`.
    #[error("strain {strain} has inverted {field} range")]
    InvertedRange {
        /// The offending strain.
        strain: StrainId,
        /// Which pair is inverted (`thc`, `yield`, `flowering_time`).
        field: &'static str,
    },

    /// The same strain id was loaded twice.
    #[error("duplicate strain id: {0}")]
    DuplicateStrain(StrainId),

    /// Harvest was attempted on a plant that is not ready.
    #[error("plant is {stage}, not harvest_ready")]
    NotHarvestReady {
        /// The plant's current stage.
        stage: Stage,
    },

    /// The plant is no longer in the ground.
    #[error("plant is already {stage}")]
    AlreadyTerminal {
        /// The plant's current stage.
        stage: Stage,
    },

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in world calculation")]
    ArithmeticOverflow,
}
