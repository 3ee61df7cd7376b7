//! Core entity structs for the Canopy simulation.
//!
//! These are plain rows: reference data (strains, locations, achievements),
//! per-player state (players, plants), immutable history (sales, ledger
//! entries, earned achievements), market rows, and weather effects. The
//! rules that mutate them live in `canopy-world` and `canopy-players`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::enums::{
    AchievementKind, Rarity, Severity, Stage, StrainType, TransactionType, WeatherKind,
};
use crate::ids::{
    AchievementId, LocationId, PlantId, PlayerId, SaleId, StrainId, TransactionId, UserId,
    WeatherEffectId,
};

// ---------------------------------------------------------------------------
// Strain
// ---------------------------------------------------------------------------

/// An immutable catalog row describing a growable strain.
///
/// Every ranged pair satisfies `min <= max`; the catalog loader rejects rows
/// that do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Strain {
    /// Unique strain identifier.
    pub id: StrainId,
    /// Display name.
    pub name: String,
    /// Botanical family.
    #[serde(rename = "type")]
    pub strain_type: StrainType,
    /// Lowest THC percentage a harvest can reach.
    pub thc_min: f64,
    /// Highest THC percentage a harvest can reach.
    pub thc_max: f64,
    /// Lowest base yield in grams.
    pub yield_min: f64,
    /// Highest base yield in grams.
    pub yield_max: f64,
    /// Shortest flowering time in days.
    pub flowering_time_min: u32,
    /// Longest flowering time in days.
    pub flowering_time_max: u32,
    /// Player level required to plant this strain.
    pub unlock_level: u32,
    /// Token cost of one seed.
    pub seed_price: u64,
    /// Shop rarity tier.
    pub rarity: Rarity,
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A player's progression ledger: balance, experience, level, reputation.
///
/// `level` is always `experience / 1000 + 1`; it is stored only so that
/// readers do not need to recompute it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Player {
    /// Unique player identifier.
    pub id: PlayerId,
    /// Owning account (one player per user).
    pub user_id: UserId,
    /// Spendable token balance.
    pub tokens: u64,
    /// Lifetime experience points.
    pub experience: u64,
    /// Level derived from experience.
    pub level: u32,
    /// Standing with buyers; gates locations.
    pub reputation: i64,
    /// Stored for the web client; not used by game rules.
    pub current_impairment: f64,
    /// Locations opened by achievements, bypassing their level and
    /// reputation gates.
    #[serde(default)]
    pub unlocked_locations: Vec<LocationId>,
    /// When the profile was provisioned.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Plant
// ---------------------------------------------------------------------------

/// A planted seed and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Plant {
    /// Unique plant identifier.
    pub id: PlantId,
    /// Owning player.
    pub player_id: PlayerId,
    /// Strain that was planted.
    pub strain_id: StrainId,
    /// Where the plant grows.
    pub location_id: LocationId,
    /// Current lifecycle stage.
    pub stage: Stage,
    /// Health in `[0, 1]`.
    pub health: f64,
    /// When the seed went into the ground.
    pub planted_at: DateTime<Utc>,
    /// When the plant reaches `harvest_ready` with no weather distortion.
    pub harvest_ready_at: DateTime<Utc>,
    /// When the plant was harvested.
    pub harvested_at: Option<DateTime<Utc>>,
    /// When the harvest was sold.
    pub sold_at: Option<DateTime<Utc>>,
    /// Harvested weight in grams.
    pub final_weight: Option<f64>,
    /// Harvested THC percentage.
    pub final_thc: Option<f64>,
    /// Harvested quality in `[0, 1]`.
    pub final_quality: Option<f64>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A place where players grow and sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Location {
    /// Unique location identifier.
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// Multiplier on every sale made here.
    pub market_modifier: f64,
    /// Minimum player level to use the location.
    pub required_level: u32,
    /// Minimum player reputation to use the location.
    pub required_reputation: i64,
    /// Maximum number of a player's growing plants at this location.
    pub max_plants: u32,
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// Supply/demand state for one strain at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketCondition {
    /// Location half of the key.
    pub location_id: LocationId,
    /// Strain half of the key.
    pub strain_id: StrainId,
    /// Demand in `[0.01, 1.0]`.
    pub demand_level: f64,
    /// Supply in `[0.01, 1.0]`.
    pub supply_level: f64,
    /// Price multiplier in `[0.5, 2.0]`.
    pub price_modifier: f64,
    /// When the row was last recomputed.
    pub updated_at: DateTime<Utc>,
}

/// One market sweep's draw for a pair, kept for price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PricePoint {
    /// Location half of the key.
    pub location_id: LocationId,
    /// Strain half of the key.
    pub strain_id: StrainId,
    /// Price multiplier drawn by the sweep.
    pub price_modifier: f64,
    /// Supply drawn by the sweep.
    pub supply_level: f64,
    /// Demand drawn by the sweep.
    pub demand_level: f64,
    /// When the sweep ran.
    pub recorded_at: DateTime<Utc>,
}

impl From<&MarketCondition> for PricePoint {
    fn from(condition: &MarketCondition) -> Self {
        Self {
            location_id: condition.location_id,
            strain_id: condition.strain_id,
            price_modifier: condition.price_modifier,
            supply_level: condition.supply_level,
            demand_level: condition.demand_level,
            recorded_at: condition.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Sale
// ---------------------------------------------------------------------------

/// Immutable record of a harvest being sold. One per plant, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Sale {
    /// Unique sale identifier.
    pub id: SaleId,
    /// Seller.
    pub player_id: PlayerId,
    /// The plant whose harvest was sold.
    pub plant_id: PlantId,
    /// Where it was sold.
    pub location_id: LocationId,
    /// Grams sold (the harvested weight).
    pub quantity: f64,
    /// Harvest quality.
    pub quality: f64,
    /// Unmodified value: base price per gram times quantity.
    pub base_price: f64,
    /// Value after location, market and quality modifiers.
    pub final_price: f64,
    /// Experience granted to the seller.
    pub experience_gained: u64,
    /// Reputation granted to the seller.
    pub reputation_gained: i64,
    /// When the sale happened.
    pub sold_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

/// A one-time reward definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Achievement {
    /// Unique achievement identifier.
    pub id: AchievementId,
    /// Display name.
    pub name: String,
    /// What the player did to earn it.
    pub description: String,
    /// Which aggregate the threshold applies to.
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    /// Threshold the aggregate must reach.
    pub requirement_value: u64,
    /// Tokens granted on earning.
    pub reward_tokens: u64,
    /// Experience granted on earning.
    pub reward_experience: u64,
    /// Location opened to the player on earning, if any.
    #[serde(default)]
    pub unlock_location_id: Option<LocationId>,
}

/// Junction row: a player earned an achievement. At most one per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlayerAchievement {
    /// The player.
    pub player_id: PlayerId,
    /// The achievement.
    pub achievement_id: AchievementId,
    /// When it was earned.
    pub earned_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Append-only record of one token-affecting event.
///
/// Credits carry a positive `amount`, spends a negative one. The ledger is
/// the source of truth for "tokens earned" totals, independent of the
/// mutable [`Player::tokens`] balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameTransaction {
    /// Unique entry identifier.
    pub id: TransactionId,
    /// Player whose balance changed.
    pub player_id: PlayerId,
    /// Category of the event.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Signed token delta.
    pub amount: i64,
    /// Human-readable description.
    pub description: String,
    /// Related row (sale, strain, achievement), if any.
    pub reference_id: Option<Uuid>,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

/// A process-wide weather effect, active in `[starts_at, ends_at)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WeatherEffect {
    /// Unique effect identifier.
    pub id: WeatherEffectId,
    /// What kind of weather.
    pub kind: WeatherKind,
    /// Named severity.
    pub severity: Severity,
    /// Linear scale on the per-kind magnitudes.
    pub severity_multiplier: f64,
    /// Start of the active window.
    pub starts_at: DateTime<Utc>,
    /// End of the active window (exclusive).
    pub ends_at: DateTime<Utc>,
}

impl WeatherEffect {
    /// Build an effect whose multiplier is taken from the named severity.
    pub fn new(
        kind: WeatherKind,
        severity: Severity,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WeatherEffectId::new(),
            kind,
            severity,
            severity_multiplier: severity.multiplier(),
            starts_at,
            ends_at,
        }
    }

    /// Whether `now` falls inside the active window.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }
}
