//! Sale pricing.
//!
//! A harvest sells for
//!
//! ```text
//! final_price = 15.0 * weight * location.market_modifier * price_modifier * quality
//! ```
//!
//! where `price_modifier` is the market row for the strain at that location
//! (1.0 if none). The seller receives `floor(final_price)` tokens,
//! `floor(final_price * 0.1)` experience and 1 to 5 reputation.
//!
//! This module only computes the quote and builds the immutable [`Sale`]
//! row. Applying it to the player and the plant is the caller's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use canopy_types::{Location, Plant, PlayerId, Sale, SaleId, Stage};
use canopy_world::RandomSource;

use crate::error::ProgressionError;

/// Price of one gram before any modifier.
pub const BASE_PRICE_PER_GRAM: f64 = 15.0;

/// Share of the final price granted as experience.
pub const EXPERIENCE_RATE: f64 = 0.1;

/// Inclusive bounds of the reputation granted per sale.
pub const REPUTATION_RANGE: (i64, i64) = (1, 5);

/// Everything a sale is worth, computed before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaleQuote {
    /// Grams sold.
    pub quantity: f64,
    /// Harvest quality.
    pub quality: f64,
    /// `15.0 * quantity`.
    pub base_price: f64,
    /// Price after every modifier.
    pub final_price: f64,
    /// Tokens credited: `floor(final_price)`.
    pub tokens: u64,
    /// Experience granted: `floor(final_price * 0.1)`.
    pub experience: u64,
    /// Reputation granted.
    pub reputation: i64,
}

/// Price a harvested plant at a location.
///
/// Draws the reputation grant from `rng`.
pub fn quote(
    plant: &Plant,
    location: &Location,
    price_modifier: f64,
    rng: &mut dyn RandomSource,
) -> Result<SaleQuote, ProgressionError> {
    if plant.stage != Stage::Harvested {
        return Err(ProgressionError::NotSellable { stage: plant.stage });
    }
    let quantity = plant
        .final_weight
        .ok_or(ProgressionError::MissingHarvestFigure("weight"))?;
    let quality = plant
        .final_quality
        .ok_or(ProgressionError::MissingHarvestFigure("quality"))?;

    let base_price = BASE_PRICE_PER_GRAM * quantity;
    let final_price = base_price * location.market_modifier * price_modifier * quality;
    let (rep_low, rep_high) = REPUTATION_RANGE;

    Ok(SaleQuote {
        quantity,
        quality,
        base_price,
        final_price,
        tokens: floor_to_u64(final_price),
        experience: floor_to_u64(final_price * EXPERIENCE_RATE),
        reputation: rng.int_inclusive(rep_low, rep_high),
    })
}

/// Build the immutable sale row for a quote.
pub fn to_sale(
    quote: &SaleQuote,
    player_id: PlayerId,
    plant: &Plant,
    location: &Location,
    now: DateTime<Utc>,
) -> Sale {
    Sale {
        id: SaleId::new(),
        player_id,
        plant_id: plant.id,
        location_id: location.id,
        quantity: quote.quantity,
        quality: quote.quality,
        base_price: quote.base_price,
        final_price: quote.final_price,
        experience_gained: quote.experience,
        reputation_gained: quote.reputation,
        sold_at: now,
    }
}

/// `floor(value)` as a token count. Negative and non-finite values are 0.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn floor_to_u64(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    if value >= u64::MAX as f64 {
        return u64::MAX;
    }
    value.floor() as u64
}
