//! Location gating and capacity.

use canopy_types::{Location, Plant, Player};

/// Why a player may not use a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenial {
    /// The player's level is below the requirement.
    Level {
        /// Required level.
        required: u32,
        /// The player's level.
        actual: u32,
    },
    /// The player's reputation is below the requirement.
    Reputation {
        /// Required reputation.
        required: i64,
        /// The player's reputation.
        actual: i64,
    },
}

/// Check whether a player meets a location's level and reputation gates.
///
/// A location the player has unlocked through an achievement skips both
/// gates.
pub fn check_access(location: &Location, player: &Player) -> Result<(), AccessDenial> {
    if player.unlocked_locations.contains(&location.id) {
        return Ok(());
    }
    if player.level < location.required_level {
        return Err(AccessDenial::Level {
            required: location.required_level,
            actual: player.level,
        });
    }
    if player.reputation < location.required_reputation {
        return Err(AccessDenial::Reputation {
            required: location.required_reputation,
            actual: player.reputation,
        });
    }
    Ok(())
}

/// Whether the player may grow and sell at the location.
pub fn is_accessible(location: &Location, player: &Player) -> bool {
    check_access(location, player).is_ok()
}

/// Number of a player's plants still in the ground at a location.
pub fn occupied_slots<'a>(
    location: &Location,
    player: &Player,
    plants: impl IntoIterator<Item = &'a Plant>,
) -> usize {
    plants
        .into_iter()
        .filter(|p| {
            p.player_id == player.id && p.location_id == location.id && p.stage.is_growing()
        })
        .count()
}

/// Whether the player has a free plant slot at the location.
pub fn has_capacity<'a>(
    location: &Location,
    player: &Player,
    plants: impl IntoIterator<Item = &'a Plant>,
) -> bool {
    let used = occupied_slots(location, player, plants);
    usize::try_from(location.max_plants).is_ok_and(|max| used < max)
}
