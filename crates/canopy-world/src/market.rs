//! Market pricing: supply/demand draws and the derived price modifier.
//!
//! Each `(location, strain)` pair carries a demand and a supply level drawn
//! uniformly from `[0.01, 1.0]`. The price modifier is
//!
//! ```text
//! clamp((demand / supply) * uniform(0.8, 1.2), 0.5, 2.0)
//! ```
//!
//! Rows are independent; re-drawing one never affects another.

use chrono::{DateTime, Utc};

use canopy_types::{LocationId, MarketCondition, StrainId};

use crate::random::RandomSource;

/// Lowest supply or demand level.
pub const LEVEL_MIN: f64 = 0.01;

/// Highest supply or demand level.
pub const LEVEL_MAX: f64 = 1.0;

/// Lowest price modifier.
pub const MODIFIER_MIN: f64 = 0.5;

/// Highest price modifier.
pub const MODIFIER_MAX: f64 = 2.0;

/// Modifier used when a pair has no market row yet.
pub const DEFAULT_PRICE_MODIFIER: f64 = 1.0;

/// Bounds of the noise factor applied to the demand/supply ratio.
const NOISE_RANGE: (f64, f64) = (0.8, 1.2);

/// Price modifier for a demand/supply pair and a noise factor.
///
/// Supply is floored at [`LEVEL_MIN`] so the ratio is always finite.
pub fn price_modifier(demand: f64, supply: f64, noise: f64) -> f64 {
    let ratio = demand / supply.max(LEVEL_MIN);
    (ratio * noise).clamp(MODIFIER_MIN, MODIFIER_MAX)
}

/// Draw a fresh market row for one pair.
///
/// Draw order: demand, supply, noise.
pub fn draw_condition(
    location_id: LocationId,
    strain_id: StrainId,
    now: DateTime<Utc>,
    rng: &mut dyn RandomSource,
) -> MarketCondition {
    let demand_level = rng.uniform(LEVEL_MIN, LEVEL_MAX);
    let supply_level = rng.uniform(LEVEL_MIN, LEVEL_MAX);
    let (low, high) = NOISE_RANGE;
    let noise = rng.uniform(low, high);

    MarketCondition {
        location_id,
        strain_id,
        demand_level,
        supply_level,
        price_modifier: price_modifier(demand_level, supply_level, noise),
        updated_at: now,
    }
}
