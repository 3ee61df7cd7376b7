//! Weather: per-kind effect tables, the active-effect board, and the
//! seasonal generator.
//!
//! # Effect tables
//!
//! Every kind has a fixed growth and health magnitude, scaled linearly by
//! the effect's severity multiplier:
//!
//! | Kind       | Growth | Health | Yield | Disease |
//! |------------|--------|--------|-------|---------|
//! | heat_wave  | -0.30  | -0.02  | -0.15 | +0.10   |
//! | cold_snap  | -0.50  | -0.03  | -0.20 | +0.05   |
//! | drought    | -0.40  | -0.04  | -0.25 | +0.20   |
//! | rain_storm | +0.10  | -0.01  |  0    | +0.15   |
//! | sunny      | +0.15  | +0.01  | +0.10 |  0      |
//! | overcast   | -0.10  |  0     |  0    |  0      |
//! | windy      | -0.05  |  0     |  0    | -0.05   |
//!
//! Growth and yield factors combine multiplicatively (each factor floored
//! at zero), health deltas and disease risks add. Duplicate effects of the
//! same kind count twice.
//!
//! # Failure semantics
//!
//! [`WeatherProvider::active_effects`] never fails. A board whose lock is
//! poisoned reports no weather and logs a warning, so plants keep growing
//! at their base rate.

use std::sync::RwLock;

use chrono::{DateTime, Datelike, Duration, Utc};

use canopy_types::{Season, Severity, WeatherEffect, WeatherEffectId, WeatherKind};

use crate::random::{RandomSource, pick};

// ---------------------------------------------------------------------------
// Effect tables
// ---------------------------------------------------------------------------

/// Growth-rate magnitude of one kind at severity 1.0.
pub const fn growth_factor(kind: WeatherKind) -> f64 {
    match kind {
        WeatherKind::HeatWave => -0.30,
        WeatherKind::ColdSnap => -0.50,
        WeatherKind::Drought => -0.40,
        WeatherKind::RainStorm => 0.10,
        WeatherKind::Sunny => 0.15,
        WeatherKind::Overcast => -0.10,
        WeatherKind::Windy => -0.05,
    }
}

/// Health delta of one kind at severity 1.0, applied per evaluation.
pub const fn health_factor(kind: WeatherKind) -> f64 {
    match kind {
        WeatherKind::HeatWave => -0.02,
        WeatherKind::ColdSnap => -0.03,
        WeatherKind::Drought => -0.04,
        WeatherKind::RainStorm => -0.01,
        WeatherKind::Sunny => 0.01,
        WeatherKind::Overcast | WeatherKind::Windy => 0.0,
    }
}

/// Apply every active effect's growth factor to a base growth ratio.
pub fn adjust_growth(base_ratio: f64, effects: &[WeatherEffect]) -> f64 {
    effects.iter().fold(base_ratio, |ratio, effect| {
        let factor = growth_factor(effect.kind)
            .mul_add(effect.severity_multiplier, 1.0)
            .max(0.0);
        ratio * factor
    })
}

/// Sum of the health deltas of every active effect.
pub fn health_delta(effects: &[WeatherEffect]) -> f64 {
    effects
        .iter()
        .map(|e| health_factor(e.kind) * e.severity_multiplier)
        .sum()
}

/// Multiplier on the base watering boost.
///
/// Heat or drought makes water count for more (x1.5); a rain storm makes it
/// count for less (x0.5). Both checks apply independently.
pub fn watering_multiplier(effects: &[WeatherEffect]) -> f64 {
    let dry = effects
        .iter()
        .any(|e| matches!(e.kind, WeatherKind::Drought | WeatherKind::HeatWave));
    let wet = effects.iter().any(|e| e.kind == WeatherKind::RainStorm);

    let mut multiplier = 1.0;
    if dry {
        multiplier *= 1.5;
    }
    if wet {
        multiplier *= 0.5;
    }
    multiplier
}

/// Harvest-weight magnitude of one kind at severity 1.0.
pub const fn yield_factor(kind: WeatherKind) -> f64 {
    match kind {
        WeatherKind::HeatWave => -0.15,
        WeatherKind::ColdSnap => -0.20,
        WeatherKind::Drought => -0.25,
        WeatherKind::Sunny => 0.10,
        WeatherKind::RainStorm | WeatherKind::Overcast | WeatherKind::Windy => 0.0,
    }
}

/// Product of every active effect's yield factor. `1.0` with no weather.
pub fn yield_multiplier(effects: &[WeatherEffect]) -> f64 {
    effects.iter().fold(1.0, |multiplier, effect| {
        multiplier
            * yield_factor(effect.kind)
                .mul_add(effect.severity_multiplier, 1.0)
                .max(0.0)
    })
}

/// Disease-risk contribution of one kind at severity 1.0.
pub const fn disease_factor(kind: WeatherKind) -> f64 {
    match kind {
        WeatherKind::HeatWave => 0.10,
        WeatherKind::ColdSnap => 0.05,
        WeatherKind::RainStorm => 0.15,
        WeatherKind::Drought => 0.20,
        WeatherKind::Windy => -0.05,
        WeatherKind::Sunny | WeatherKind::Overcast => 0.0,
    }
}

/// Chance per tick that a growing plant falls ill, clamped to `[0, 1]`.
pub fn disease_risk(effects: &[WeatherEffect]) -> f64 {
    effects
        .iter()
        .map(|e| disease_factor(e.kind) * e.severity_multiplier)
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

/// What a weather-driven illness is reported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ailment {
    /// Damp rot on the flowers.
    Mold,
    /// Waterlogged roots.
    RootRot,
    /// Scorching.
    HeatStress,
    /// Starved of water and feed.
    NutrientDeficiency,
    /// Frost damage.
    ColdStress,
    /// Any other weather.
    GeneralStress,
    /// No weather was running.
    EnvironmentalStress,
}

impl Ailment {
    /// Snake-case label used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mold => "mold",
            Self::RootRot => "root_rot",
            Self::HeatStress => "heat_stress",
            Self::NutrientDeficiency => "nutrient_deficiency",
            Self::ColdStress => "cold_stress",
            Self::GeneralStress => "general_stress",
            Self::EnvironmentalStress => "environmental_stress",
        }
    }

    /// The ailment caused by the first listed effect.
    ///
    /// A rain storm is a coin flip between mold and root rot.
    pub fn from_weather(effects: &[WeatherEffect], rng: &mut dyn RandomSource) -> Self {
        let Some(first) = effects.first() else {
            return Self::EnvironmentalStress;
        };
        match first.kind {
            WeatherKind::RainStorm => {
                if rng.chance(0.5) {
                    Self::Mold
                } else {
                    Self::RootRot
                }
            }
            WeatherKind::HeatWave => Self::HeatStress,
            WeatherKind::Drought => Self::NutrientDeficiency,
            WeatherKind::ColdSnap => Self::ColdStress,
            WeatherKind::Sunny | WeatherKind::Overcast | WeatherKind::Windy => {
                Self::GeneralStress
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Source of the weather effects active at a given instant.
pub trait WeatherProvider: Send + Sync {
    /// Every effect whose window contains `now`. Unordered; never fails.
    fn active_effects(&self, now: DateTime<Utc>) -> Vec<WeatherEffect>;
}

/// A provider with permanently clear skies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearSkies;

impl WeatherProvider for ClearSkies {
    fn active_effects(&self, _now: DateTime<Utc>) -> Vec<WeatherEffect> {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// The shared list of scheduled and running weather effects.
#[derive(Debug, Default)]
pub struct WeatherBoard {
    effects: RwLock<Vec<WeatherEffect>>,
}

impl WeatherBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an effect. Returns `false` if the board is unavailable.
    pub fn add(&self, effect: WeatherEffect) -> bool {
        let Ok(mut effects) = self.effects.write() else {
            tracing::warn!("weather board lock poisoned, dropping new effect");
            return false;
        };
        tracing::info!(
            kind = effect.kind.as_str(),
            severity = ?effect.severity,
            starts_at = %effect.starts_at,
            ends_at = %effect.ends_at,
            "weather effect scheduled"
        );
        effects.push(effect);
        true
    }

    /// End an effect early by moving its end to `now`.
    ///
    /// Returns `true` if the effect existed and was still running.
    pub fn end_early(&self, id: WeatherEffectId, now: DateTime<Utc>) -> bool {
        let Ok(mut effects) = self.effects.write() else {
            tracing::warn!("weather board lock poisoned, cannot end effect");
            return false;
        };
        let Some(effect) = effects.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        if effect.ends_at <= now {
            return false;
        }
        effect.ends_at = now.max(effect.starts_at);
        tracing::info!(effect_id = %id, "weather effect ended early");
        true
    }

    /// Drop effects that ended at or before `now`. Returns how many were removed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let Ok(mut effects) = self.effects.write() else {
            return 0;
        };
        let before = effects.len();
        effects.retain(|e| e.ends_at > now);
        before.saturating_sub(effects.len())
    }

    /// Effects that start within `horizon` after `now`.
    pub fn forecast(&self, now: DateTime<Utc>, horizon: Duration) -> Vec<WeatherEffect> {
        let until = now.checked_add_signed(horizon).unwrap_or(now);
        self.effects.read().map_or_else(
            |_poisoned| Vec::new(),
            |effects| {
                effects
                    .iter()
                    .filter(|e| e.starts_at > now && e.starts_at <= until)
                    .cloned()
                    .collect()
            },
        )
    }
}

impl WeatherProvider for WeatherBoard {
    fn active_effects(&self, now: DateTime<Utc>) -> Vec<WeatherEffect> {
        match self.effects.read() {
            Ok(effects) => effects
                .iter()
                .filter(|e| e.is_active_at(now))
                .cloned()
                .collect(),
            Err(_poisoned) => {
                tracing::warn!("weather board lock poisoned, reporting clear skies");
                Vec::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Seasonal generator
// ---------------------------------------------------------------------------

/// Chance per cycle of a new seasonal effect while others are running.
const SEASONAL_CHANCE: f64 = 0.20;

/// Chance per cycle of a severe event.
const SEVERE_CHANCE: f64 = 0.05;

/// Share of seasonal effects that are mild (the rest are moderate).
const MILD_SHARE: f64 = 0.70;

/// Kinds a severe event can be.
const SEVERE_KINDS: [WeatherKind; 3] = [
    WeatherKind::HeatWave,
    WeatherKind::ColdSnap,
    WeatherKind::Drought,
];

/// Plausible weather kinds for a season.
pub const fn seasonal_kinds(season: Season) -> [WeatherKind; 3] {
    match season {
        Season::Winter => [
            WeatherKind::ColdSnap,
            WeatherKind::Overcast,
            WeatherKind::Windy,
        ],
        Season::Spring => [
            WeatherKind::RainStorm,
            WeatherKind::Sunny,
            WeatherKind::Overcast,
        ],
        Season::Summer => [
            WeatherKind::HeatWave,
            WeatherKind::Sunny,
            WeatherKind::RainStorm,
        ],
        Season::Autumn => [
            WeatherKind::Overcast,
            WeatherKind::Windy,
            WeatherKind::ColdSnap,
        ],
    }
}

/// Generates new weather effects once per weather cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherSystem;

impl WeatherSystem {
    /// Roll the effects to start at `now`.
    ///
    /// With nothing active a seasonal effect always starts. Otherwise there
    /// is a 20% chance of a seasonal effect and, independently, a 5% chance
    /// of a severe heat wave, cold snap or drought lasting 1 to 6 hours.
    pub fn roll(
        self,
        active: &[WeatherEffect],
        now: DateTime<Utc>,
        rng: &mut dyn RandomSource,
    ) -> Vec<WeatherEffect> {
        let mut started = Vec::new();

        if active.is_empty() || rng.chance(SEASONAL_CHANCE) {
            started.extend(Self::seasonal(now, rng));
        }

        if rng.chance(SEVERE_CHANCE) {
            if let Some(kind) = pick(rng, &SEVERE_KINDS).copied() {
                let hours = rng.int_inclusive(1, 6);
                started.push(WeatherEffect::new(
                    kind,
                    Severity::Severe,
                    now,
                    hours_after(now, hours),
                ));
            }
        }

        started
    }

    /// A mild or moderate effect typical of the current season, 4 to 16 hours long.
    fn seasonal(now: DateTime<Utc>, rng: &mut dyn RandomSource) -> Option<WeatherEffect> {
        let kinds = seasonal_kinds(Season::from_month(now.month()));
        let kind = *pick(rng, &kinds)?;
        let severity = if rng.chance(MILD_SHARE) {
            Severity::Mild
        } else {
            Severity::Moderate
        };
        let hours = rng.int_inclusive(4, 16);
        Some(WeatherEffect::new(kind, severity, now, hours_after(now, hours)))
    }

    /// Prune expired effects, roll new ones, and post them to the board.
    ///
    /// Returns the effects that were started.
    pub fn run_cycle(
        self,
        board: &WeatherBoard,
        now: DateTime<Utc>,
        rng: &mut dyn RandomSource,
    ) -> Vec<WeatherEffect> {
        let pruned = board.prune(now);
        let active = board.active_effects(now);
        let started = self.roll(&active, now, rng);
        for effect in &started {
            board.add(effect.clone());
        }
        tracing::debug!(
            pruned,
            active = active.len(),
            started = started.len(),
            "weather cycle complete"
        );
        started
    }
}

/// `now` plus a number of hours, saturating at `now` on overflow.
fn hours_after(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    Duration::try_hours(hours)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(now)
}
