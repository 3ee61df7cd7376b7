//! Enumeration types for the Canopy simulation.
//!
//! Wire names are `snake_case` so that rows written by the web backend
//! (`"harvest_ready"`, `"plant_sale"`, ...) deserialize without mapping.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Strain reference data
// ---------------------------------------------------------------------------

/// Botanical family of a strain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StrainType {
    /// Short, dense, fast-flowering plants.
    Indica,
    /// Tall plants with long flowering windows.
    Sativa,
    /// A cross of indica and sativa genetics.
    Hybrid,
}

/// How rare a strain is in the seed shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Rarity {
    /// Available to everyone from the start.
    Common,
    /// Mid-tier genetics.
    Uncommon,
    /// High-tier genetics.
    Rare,
    /// Top-tier genetics.
    Legendary,
}

// ---------------------------------------------------------------------------
// Plant lifecycle
// ---------------------------------------------------------------------------

/// A plant's position in its lifecycle.
///
/// Variants are declared in lifecycle order, so the derived [`Ord`] is the
/// forward direction of the state machine: a stage may only ever be replaced
/// by a greater one.
///
/// ```text
/// germination -> seedling -> vegetative -> flowering -> harvest_ready -> harvested -> sold
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Stage {
    /// Seed has just been planted.
    Germination,
    /// First leaves.
    Seedling,
    /// Leaf and stem growth.
    Vegetative,
    /// Bud development.
    Flowering,
    /// Fully grown and waiting to be harvested.
    HarvestReady,
    /// Harvested; weight, potency and quality are fixed.
    Harvested,
    /// Harvest has been sold. No further transitions.
    Sold,
}

impl Stage {
    /// Whether the plant is still in the ground (time-driven stages).
    pub const fn is_growing(self) -> bool {
        matches!(
            self,
            Self::Germination
                | Self::Seedling
                | Self::Vegetative
                | Self::Flowering
                | Self::HarvestReady
        )
    }

    /// Database / wire name of the stage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Germination => "germination",
            Self::Seedling => "seedling",
            Self::Vegetative => "vegetative",
            Self::Flowering => "flowering",
            Self::HarvestReady => "harvest_ready",
            Self::Harvested => "harvested",
            Self::Sold => "sold",
        }
    }
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

/// A kind of weather effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum WeatherKind {
    /// Extreme heat.
    HeatWave,
    /// Sudden cold.
    ColdSnap,
    /// Prolonged dry spell.
    Drought,
    /// Heavy rain and wind.
    RainStorm,
    /// Clear skies.
    Sunny,
    /// Cloud cover, reduced light.
    Overcast,
    /// Strong wind.
    Windy,
}

impl WeatherKind {
    /// Database / wire name of the weather kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HeatWave => "heat_wave",
            Self::ColdSnap => "cold_snap",
            Self::Drought => "drought",
            Self::RainStorm => "rain_storm",
            Self::Sunny => "sunny",
            Self::Overcast => "overcast",
            Self::Windy => "windy",
        }
    }
}

/// Named severity of a weather effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Severity {
    /// Half strength.
    Mild,
    /// Nominal strength.
    Moderate,
    /// One and a half times nominal.
    Severe,
    /// Double strength.
    Extreme,
}

impl Severity {
    /// Linear scale applied to every per-kind magnitude.
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Mild => 0.5,
            Self::Moderate => 1.0,
            Self::Severe => 1.5,
            Self::Extreme => 2.0,
        }
    }
}

/// Calendar season, used to pick plausible weather.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Season {
    /// December through February.
    Winter,
    /// March through May.
    Spring,
    /// June through August.
    Summer,
    /// September through November.
    Autumn,
}

impl Season {
    /// Map a calendar month (1-12) to its northern-hemisphere season.
    ///
    /// Out-of-range months fall back to winter.
    pub const fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Category of a token-affecting ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TransactionType {
    /// Tokens received for selling a harvest.
    PlantSale,
    /// Tokens added directly to the balance (shop packages, grants).
    TokenPurchase,
    /// Tokens spent on a seed (negative amount).
    SeedPurchase,
    /// Tokens granted by an achievement.
    AchievementReward,
    /// Tokens granted for reaching a new level.
    LevelUpBonus,
}

impl TransactionType {
    /// Whether the entry counts toward the `tokens_earned` achievement total.
    pub const fn counts_as_earned(self) -> bool {
        matches!(self, Self::PlantSale | Self::TokenPurchase)
    }

    /// Whether entries of this type carry a negative amount.
    pub const fn is_debit(self) -> bool {
        matches!(self, Self::SeedPurchase)
    }

    /// Database / wire name of the transaction type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlantSale => "plant_sale",
            Self::TokenPurchase => "token_purchase",
            Self::SeedPurchase => "seed_purchase",
            Self::AchievementReward => "achievement_reward",
            Self::LevelUpBonus => "level_up_bonus",
        }
    }
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

/// The aggregate an achievement threshold is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AchievementKind {
    /// Player level reaches the threshold.
    LevelMilestone,
    /// Number of sales reaches the threshold.
    SalesMilestone,
    /// Ledger sum of sale and purchase credits reaches the threshold.
    TokensEarned,
    /// Number of distinct strains ever planted reaches the threshold.
    StrainCollection,
}
