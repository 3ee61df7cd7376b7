//! Player progression: tokens, experience, level, reputation.
//!
//! # Level Formula
//!
//! ```text
//! level = floor(experience / 1000) + 1
//! ```
//!
//! Level is a pure function of experience. Crossing one or more level
//! boundaries in a single grant pays `50 * levels_gained` bonus tokens.
//!
//! Every mutation is checked: a spend that exceeds the balance fails with
//! [`ProgressionError::InsufficientFunds`] and leaves the player untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use canopy_types::{LocationId, Player, PlayerId, UserId};

use crate::error::ProgressionError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Experience needed per level.
pub const XP_PER_LEVEL: u64 = 1000;

/// Bonus tokens paid per level gained.
pub const LEVEL_UP_BONUS: u64 = 50;

/// Balance of a freshly provisioned player.
pub const DEFAULT_STARTING_TOKENS: u64 = 100;

/// Reputation of a freshly provisioned player.
pub const DEFAULT_STARTING_REPUTATION: i64 = 100;

// ---------------------------------------------------------------------------
// Level-up event
// ---------------------------------------------------------------------------

/// Reported to the caller when an experience grant crosses a level boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    /// Level before the grant.
    pub old_level: u32,
    /// Level after the grant.
    pub new_level: u32,
    /// Bonus tokens credited.
    pub token_reward: u64,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Level for a lifetime experience total.
pub fn level_for_experience(experience: u64) -> u32 {
    let level = experience
        .checked_div(XP_PER_LEVEL)
        .unwrap_or(0)
        .saturating_add(1);
    u32::try_from(level).unwrap_or(u32::MAX)
}

/// Provision a new player for a user.
pub fn new_player(
    user_id: UserId,
    starting_tokens: u64,
    starting_reputation: i64,
    now: DateTime<Utc>,
) -> Player {
    Player {
        id: PlayerId::new(),
        user_id,
        tokens: starting_tokens,
        experience: 0,
        level: level_for_experience(0),
        reputation: starting_reputation,
        current_impairment: 0.0,
        unlocked_locations: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

/// Add tokens to the balance. Returns the new balance.
pub fn credit_tokens(
    player: &mut Player,
    amount: u64,
    now: DateTime<Utc>,
) -> Result<u64, ProgressionError> {
    let balance = player
        .tokens
        .checked_add(amount)
        .ok_or(ProgressionError::ArithmeticOverflow {
            context: "token credit",
        })?;
    player.tokens = balance;
    player.updated_at = now;
    Ok(balance)
}

/// Remove tokens from the balance. Returns the new balance.
///
/// Fails without mutating if the balance is too small.
pub fn debit_tokens(
    player: &mut Player,
    amount: u64,
    now: DateTime<Utc>,
) -> Result<u64, ProgressionError> {
    let balance = player
        .tokens
        .checked_sub(amount)
        .ok_or(ProgressionError::InsufficientFunds {
            required: amount,
            available: player.tokens,
        })?;
    player.tokens = balance;
    player.updated_at = now;
    Ok(balance)
}

/// Grant experience, recompute the level, and pay any level-up bonus.
///
/// The player is only mutated if every step succeeds.
pub fn apply_experience(
    player: &mut Player,
    points: u64,
    now: DateTime<Utc>,
) -> Result<Option<LevelUp>, ProgressionError> {
    let experience =
        player
            .experience
            .checked_add(points)
            .ok_or(ProgressionError::ArithmeticOverflow {
                context: "experience grant",
            })?;
    let old_level = player.level;
    let new_level = level_for_experience(experience);

    let level_up = if new_level > old_level {
        let gained = u64::from(new_level.saturating_sub(old_level));
        let token_reward = gained.checked_mul(LEVEL_UP_BONUS).ok_or(
            ProgressionError::ArithmeticOverflow {
                context: "level-up bonus",
            },
        )?;
        let tokens = player.tokens.checked_add(token_reward).ok_or(
            ProgressionError::ArithmeticOverflow {
                context: "level-up bonus",
            },
        )?;
        player.tokens = tokens;
        Some(LevelUp {
            old_level,
            new_level,
            token_reward,
        })
    } else {
        None
    };

    player.experience = experience;
    player.level = new_level.max(old_level);
    player.updated_at = now;

    if let Some(event) = level_up {
        tracing::info!(
            player_id = %player.id,
            old_level = event.old_level,
            new_level = event.new_level,
            token_reward = event.token_reward,
            "player levelled up"
        );
    }
    Ok(level_up)
}

/// Add (or remove, if negative) reputation, saturating at the `i64` bounds.
pub fn adjust_reputation(player: &mut Player, delta: i64, now: DateTime<Utc>) -> i64 {
    player.reputation = player.reputation.saturating_add(delta);
    player.updated_at = now;
    player.reputation
}

/// Open a location to the player regardless of its gates.
///
/// Returns `false` if it was already unlocked.
pub fn unlock_location(player: &mut Player, location_id: LocationId, now: DateTime<Utc>) -> bool {
    if player.unlocked_locations.contains(&location_id) {
        return false;
    }
    player.unlocked_locations.push(location_id);
    player.updated_at = now;
    tracing::info!(player_id = %player.id, location_id = %location_id, "location unlocked");
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fresh() -> Player {
        new_player(
            UserId::new(),
            DEFAULT_STARTING_TOKENS,
            DEFAULT_STARTING_REPUTATION,
            Utc::now(),
        )
    }

    #[test]
    fn level_formula() {
        assert_eq!(level_for_experience(0), 1);
        assert_eq!(level_for_experience(999), 1);
        assert_eq!(level_for_experience(1000), 2);
        assert_eq!(level_for_experience(4_500), 5);
        assert_eq!(level_for_experience(u64::MAX), u32::MAX);
    }

    #[test]
    fn new_player_defaults() {
        let player = fresh();
        assert_eq!(player.tokens, 100);
        assert_eq!(player.reputation, 100);
        assert_eq!(player.level, 1);
        assert_eq!(player.experience, 0);
    }

    #[test]
    fn thousand_xp_levels_up_once_with_fifty_tokens() {
        let mut player = fresh();
        let event = apply_experience(&mut player, 1000, Utc::now()).unwrap();
        assert_eq!(
            event,
            Some(LevelUp {
                old_level: 1,
                new_level: 2,
                token_reward: 50
            })
        );
        assert_eq!(player.level, 2);
        assert_eq!(player.tokens, 150);

        let again = apply_experience(&mut player, 0, Utc::now()).unwrap();
        assert_eq!(again, None);
        assert_eq!(player.tokens, 150);
    }

    #[test]
    fn multi_level_jump_pays_per_level() {
        let mut player = fresh();
        let event = apply_experience(&mut player, 3_200, Utc::now()).unwrap();
        assert_eq!(event.map(|e| e.token_reward), Some(150));
        assert_eq!(player.level, 4);
    }

    #[test]
    fn debit_fails_without_mutation() {
        let mut player = fresh();
        let before = player.clone();
        let result = debit_tokens(&mut player, 101, Utc::now());
        assert!(matches!(
            result,
            Err(ProgressionError::InsufficientFunds {
                required: 101,
                available: 100
            })
        ));
        assert_eq!(player, before);
    }

    #[test]
    fn credit_and_debit() {
        let mut player = fresh();
        assert_eq!(credit_tokens(&mut player, 25, Utc::now()).unwrap(), 125);
        assert_eq!(debit_tokens(&mut player, 125, Utc::now()).unwrap(), 0);
    }

    #[test]
    fn credit_overflow_is_an_error() {
        let mut player = fresh();
        player.tokens = u64::MAX;
        assert!(matches!(
            credit_tokens(&mut player, 1, Utc::now()),
            Err(ProgressionError::ArithmeticOverflow { .. })
        ));
        assert_eq!(player.tokens, u64::MAX);
    }

    #[test]
    fn unlocking_twice_is_a_no_op() {
        let mut player = fresh();
        let garden = LocationId::new();
        assert!(unlock_location(&mut player, garden, Utc::now()));
        assert!(!unlock_location(&mut player, garden, Utc::now()));
        assert_eq!(player.unlocked_locations, vec![garden]);
    }

    #[test]
    fn reputation_saturates() {
        let mut player = fresh();
        player.reputation = i64::MAX - 1;
        assert_eq!(adjust_reputation(&mut player, 5, Utc::now()), i64::MAX);
    }
}
