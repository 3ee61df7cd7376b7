//! Error types for the game service and its row store.
//!
//! [`GameError`] is what callers of [`GameService`](crate::GameService)
//! see. Every variant is a local, recoverable condition; none of them
//! indicate that the process should stop.

use canopy_ledger::LedgerError;
use canopy_players::ProgressionError;
use canopy_types::{LocationId, Stage, StrainId};
use canopy_world::{AccessDenial, WorldError};

/// Errors raised by a [`GameStore`](crate::store::GameStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A row that must exist does not.
    #[error("{table} row {id} not found")]
    Missing {
        /// Table name.
        table: &'static str,
        /// Row id, rendered.
        id: String,
    },

    /// A row with this key already exists.
    #[error("{table} row {id} already exists")]
    Duplicate {
        /// Table name.
        table: &'static str,
        /// Row id, rendered.
        id: String,
    },

    /// A lock guarding the table was poisoned by a panicking writer.
    #[error("{table} table lock poisoned")]
    Poisoned {
        /// Table name.
        table: &'static str,
    },
}

/// Errors reported by game operations.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// A strain, plant, location, player or achievement does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// What was looked up.
        kind: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// The operation is illegal in the entity's current state.
    #[error("invalid state: {reason}")]
    InvalidState {
        /// What is wrong.
        reason: String,
    },

    /// A spend exceeds the player's balance.
    #[error("insufficient funds: need {required} tokens, have {available}")]
    InsufficientFunds {
        /// Tokens the operation needs.
        required: u64,
        /// Tokens the player holds.
        available: u64,
    },

    /// The strain id is not in the catalog.
    #[error("unknown strain {0}")]
    InvalidStrain(StrainId),

    /// The player's level is below the strain's unlock level.
    #[error("strain {strain} unlocks at level {required}, player is level {level}")]
    StrainLocked {
        /// The locked strain.
        strain: StrainId,
        /// Unlock level.
        required: u32,
        /// The player's level.
        level: u32,
    },

    /// The player does not meet the location's level or reputation gate.
    #[error("location {location} is locked: {reason}")]
    LocationLocked {
        /// The locked location.
        location: LocationId,
        /// Which gate failed.
        reason: String,
    },

    /// The player has no free plant slot at the location.
    #[error("location {location} is full ({max_plants} plants)")]
    LocationFull {
        /// The full location.
        location: LocationId,
        /// Capacity.
        max_plants: u32,
    },

    /// A row store failure.
    #[error("store error: {0}")]
    Store(StoreError),

    /// A ledger entry failed validation.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A progression computation overflowed.
    #[error("progression error: {0}")]
    Progression(ProgressionError),

    /// A world rule failed.
    #[error("world error: {0}")]
    World(WorldError),
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing { table, id } => Self::NotFound { kind: table, id },
            other => Self::Store(other),
        }
    }
}

impl From<ProgressionError> for GameError {
    fn from(err: ProgressionError) -> Self {
        match err {
            ProgressionError::InsufficientFunds {
                required,
                available,
            } => Self::InsufficientFunds {
                required,
                available,
            },
            ProgressionError::NotSellable { stage } => Self::InvalidState {
                reason: not_sellable(stage),
            },
            other => Self::Progression(other),
        }
    }
}

impl From<WorldError> for GameError {
    fn from(err: WorldError) -> Self {
        match err {
            WorldError::NotHarvestReady { stage } => Self::InvalidState {
                reason: format!("plant is {stage}, not harvest_ready"),
            },
            WorldError::AlreadyTerminal { stage } => Self::InvalidState {
                reason: format!("plant is already {stage}"),
            },
            other => Self::World(other),
        }
    }
}

fn not_sellable(stage: Stage) -> String {
    match stage {
        Stage::Sold => "plant has already been sold".to_owned(),
        other => format!("plant is {other}, only harvested plants can be sold"),
    }
}

impl GameError {
    /// Shorthand for [`GameError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// A [`GameError::LocationLocked`] describing which gate failed.
    pub fn location_locked(location: LocationId, denial: AccessDenial) -> Self {
        let reason = match denial {
            AccessDenial::Level { required, actual } => {
                format!("requires level {required}, player is level {actual}")
            }
            AccessDenial::Reputation { required, actual } => {
                format!("requires reputation {required}, player has {actual}")
            }
        };
        Self::LocationLocked { location, reason }
    }

    /// Shorthand for [`GameError::InvalidState`].
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }
}
