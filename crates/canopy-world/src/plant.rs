//! The plant lifecycle state machine.
//!
//! A plant moves forward through
//! `germination -> seedling -> vegetative -> flowering -> harvest_ready`
//! purely as a function of elapsed time (bent by the weather), then through
//! `harvested` and `sold` by player action. Stages never move backwards.
//!
//! Growth is measured as a ratio of elapsed time to the planned growing
//! window:
//!
//! ```text
//! base_ratio = (now - planted_at) / (harvest_ready_at - planted_at)
//! ```
//!
//! The weather-adjusted ratio is compared against fixed thresholds to pick
//! the stage.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use canopy_types::{LocationId, Plant, PlantId, PlayerId, Stage, Strain, WeatherEffect};

use crate::error::WorldError;
use crate::random::RandomSource;
use crate::weather::{self, Ailment};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Growth ratio at which a plant becomes a seedling.
pub const SEEDLING_AT: f64 = 0.1;

/// Growth ratio at which a plant enters vegetative growth.
pub const VEGETATIVE_AT: f64 = 0.3;

/// Growth ratio at which a plant starts flowering.
pub const FLOWERING_AT: f64 = 0.7;

/// Growth ratio at which a plant can be harvested.
pub const HARVEST_READY_AT: f64 = 1.0;

/// Health restored by one watering before weather multipliers.
pub const BASE_WATER_BOOST: f64 = 0.05;

/// Health lost when a plant falls ill.
pub const DISEASE_DAMAGE: f64 = 0.15;

/// Bounds of the random quality multiplier drawn at harvest.
pub const QUALITY_MULTIPLIER_RANGE: (f64, f64) = (0.8, 1.2);

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What one evaluation did to a plant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Stage before the evaluation.
    pub previous_stage: Stage,
    /// Stage after the evaluation.
    pub stage: Stage,
    /// Weather-adjusted growth ratio that drove stage selection.
    pub growth_ratio: f64,
    /// Health change actually applied (after clamping).
    pub health_change: f64,
}

impl Evaluation {
    /// Whether the stage moved forward.
    pub fn stage_changed(&self) -> bool {
        self.stage != self.previous_stage
    }

    /// Whether the plant row needs to be written back.
    pub fn is_dirty(&self) -> bool {
        self.stage_changed() || self.health_change.abs() > f64::EPSILON
    }
}

/// Result of watering a plant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterOutcome {
    /// Boost after weather multipliers (before clamping).
    pub health_boost: f64,
    /// Health after watering.
    pub new_health: f64,
}

/// Fixed harvest figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarvestOutcome {
    /// Harvested weight in grams.
    pub weight: f64,
    /// THC percentage.
    pub thc: f64,
    /// Quality in `[0, 1]`.
    pub quality: f64,
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Create a freshly planted seed.
///
/// The growing window is a whole number of days drawn uniformly from the
/// strain's flowering range.
pub fn sow(
    player_id: PlayerId,
    strain: &Strain,
    location_id: LocationId,
    now: DateTime<Utc>,
    rng: &mut dyn RandomSource,
) -> Result<Plant, WorldError> {
    let days = rng.int_inclusive(
        i64::from(strain.flowering_time_min),
        i64::from(strain.flowering_time_max),
    );
    let window = Duration::try_days(days).ok_or(WorldError::ArithmeticOverflow)?;
    let harvest_ready_at = now
        .checked_add_signed(window)
        .ok_or(WorldError::ArithmeticOverflow)?;

    Ok(Plant {
        id: PlantId::new(),
        player_id,
        strain_id: strain.id,
        location_id,
        stage: Stage::Germination,
        health: 1.0,
        planted_at: now,
        harvest_ready_at,
        harvested_at: None,
        sold_at: None,
        final_weight: None,
        final_thc: None,
        final_quality: None,
        updated_at: now,
    })
}

// ---------------------------------------------------------------------------
// Growth
// ---------------------------------------------------------------------------

/// Unadjusted growth ratio, never negative.
///
/// A plant with an empty growing window counts as fully grown.
#[allow(clippy::cast_precision_loss)]
pub fn base_growth_ratio(plant: &Plant, now: DateTime<Utc>) -> f64 {
    let window = plant
        .harvest_ready_at
        .signed_duration_since(plant.planted_at)
        .num_milliseconds();
    if window <= 0 {
        return HARVEST_READY_AT;
    }
    let elapsed = now
        .signed_duration_since(plant.planted_at)
        .num_milliseconds()
        .max(0);
    elapsed as f64 / window as f64
}

/// Stage selected by a growth ratio.
pub fn stage_for_ratio(ratio: f64) -> Stage {
    if ratio >= HARVEST_READY_AT {
        Stage::HarvestReady
    } else if ratio >= FLOWERING_AT {
        Stage::Flowering
    } else if ratio >= VEGETATIVE_AT {
        Stage::Vegetative
    } else if ratio >= SEEDLING_AT {
        Stage::Seedling
    } else {
        Stage::Germination
    }
}

/// Re-evaluate a growing plant's stage and health.
///
/// The new stage is the later of the stored stage and the one the
/// weather-adjusted ratio selects, so a cold snap can slow a plant down but
/// never push it back a stage. Weather health deltas are applied and health
/// is clamped to `[0, 1]`; a plant at zero health keeps its stage.
///
/// Harvested and sold plants are returned unchanged.
pub fn evaluate(plant: &mut Plant, effects: &[WeatherEffect], now: DateTime<Utc>) -> Evaluation {
    let previous_stage = plant.stage;
    if !previous_stage.is_growing() {
        return Evaluation {
            previous_stage,
            stage: previous_stage,
            growth_ratio: HARVEST_READY_AT,
            health_change: 0.0,
        };
    }

    let growth_ratio = weather::adjust_growth(base_growth_ratio(plant, now), effects);
    let stage = previous_stage.max(stage_for_ratio(growth_ratio));

    let old_health = plant.health;
    let new_health = (old_health + weather::health_delta(effects)).clamp(0.0, 1.0);
    let health_change = new_health - old_health;

    plant.stage = stage;
    plant.health = new_health;

    let evaluation = Evaluation {
        previous_stage,
        stage,
        growth_ratio,
        health_change,
    };
    if evaluation.is_dirty() {
        plant.updated_at = now;
    }
    evaluation
}

/// Roll for a weather-driven illness on a growing plant.
///
/// The chance is [`weather::disease_risk`]; a hit costs [`DISEASE_DAMAGE`]
/// health, floored at zero. Terminal plants and plants already at zero
/// health never fall ill, and nothing is drawn for them.
pub fn roll_disease(
    plant: &mut Plant,
    effects: &[WeatherEffect],
    now: DateTime<Utc>,
    rng: &mut dyn RandomSource,
) -> Option<Ailment> {
    if !plant.stage.is_growing() || plant.health <= 0.0 {
        return None;
    }
    if !rng.chance(weather::disease_risk(effects)) {
        return None;
    }
    let ailment = Ailment::from_weather(effects, rng);
    plant.health = (plant.health - DISEASE_DAMAGE).max(0.0);
    plant.updated_at = now;
    Some(ailment)
}

// ---------------------------------------------------------------------------
// Player actions
// ---------------------------------------------------------------------------

/// Water a growing plant.
///
/// The base boost is scaled by [`weather::watering_multiplier`] and health
/// is capped at 1.0. There is no cooldown.
pub fn water(
    plant: &mut Plant,
    effects: &[WeatherEffect],
    now: DateTime<Utc>,
) -> Result<WaterOutcome, WorldError> {
    if !plant.stage.is_growing() {
        return Err(WorldError::AlreadyTerminal { stage: plant.stage });
    }
    let health_boost = BASE_WATER_BOOST * weather::watering_multiplier(effects);
    let new_health = (plant.health + health_boost).clamp(0.0, 1.0);

    plant.health = new_health;
    plant.updated_at = now;

    Ok(WaterOutcome {
        health_boost,
        new_health,
    })
}

/// Harvest a ready plant, fixing its weight, potency and quality.
///
/// Draws, in order: base yield, quality multiplier, THC. The weight is
/// scaled by the weather's [`weather::yield_multiplier`]. Fails without
/// touching the plant unless it is `harvest_ready`.
pub fn harvest(
    plant: &mut Plant,
    strain: &Strain,
    effects: &[WeatherEffect],
    now: DateTime<Utc>,
    rng: &mut dyn RandomSource,
) -> Result<HarvestOutcome, WorldError> {
    if plant.stage != Stage::HarvestReady {
        return Err(WorldError::NotHarvestReady { stage: plant.stage });
    }

    let base_yield = rng.uniform(strain.yield_min, strain.yield_max);
    let (q_low, q_high) = QUALITY_MULTIPLIER_RANGE;
    let quality_multiplier = rng.uniform(q_low, q_high);
    let thc = rng.uniform(strain.thc_min, strain.thc_max);

    let outcome = HarvestOutcome {
        weight: base_yield
            * plant.health
            * quality_multiplier
            * weather::yield_multiplier(effects),
        thc,
        quality: (plant.health * quality_multiplier).min(1.0),
    };

    plant.stage = Stage::Harvested;
    plant.harvested_at = Some(now);
    plant.final_weight = Some(outcome.weight);
    plant.final_thc = Some(outcome.thc);
    plant.final_quality = Some(outcome.quality);
    plant.updated_at = now;

    Ok(outcome)
}

/// Mark a harvested plant as sold. Only `harvested` plants can be sold.
pub fn mark_sold(plant: &mut Plant, now: DateTime<Utc>) -> Result<(), WorldError> {
    match plant.stage {
        Stage::Harvested => {
            plant.stage = Stage::Sold;
            plant.sold_at = Some(now);
            plant.updated_at = now;
            Ok(())
        }
        Stage::Sold => Err(WorldError::AlreadyTerminal { stage: Stage::Sold }),
        stage => Err(WorldError::NotHarvestReady { stage }),
    }
}
