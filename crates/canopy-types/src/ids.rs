//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every row in the game has a strongly-typed ID so that a plant ID can
//! never be passed where a player ID is expected. All IDs use UUID v7
//! (time-ordered) for efficient database indexing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of an authenticated account, issued by the auth service.
    UserId
}

define_id! {
    /// Unique identifier for a player (the game profile owned by one user).
    PlayerId
}

define_id! {
    /// Unique identifier for a strain in the catalog.
    StrainId
}

define_id! {
    /// Unique identifier for a planted seed.
    PlantId
}

define_id! {
    /// Unique identifier for a growing/selling location.
    LocationId
}

define_id! {
    /// Unique identifier for a completed sale.
    SaleId
}

define_id! {
    /// Unique identifier for an achievement definition.
    AchievementId
}

define_id! {
    /// Unique identifier for a ledger entry (token-affecting event).
    TransactionId
}

define_id! {
    /// Unique identifier for a weather effect.
    WeatherEffectId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = PlantId::new();
        let b = PlantId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn id_display_matches_uuid() {
        let uuid = Uuid::now_v7();
        let id = PlayerId::from(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
        assert_eq!(Uuid::from(id), uuid);
    }

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = StrainId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{}\"", id.into_inner()));
    }
}
