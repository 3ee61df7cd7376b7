//! Reference data: the strain catalog and the starter world.
//!
//! [`StrainCatalog`] validates and indexes strain rows. The `starter_*`
//! functions produce the default strains, locations and achievements a
//! fresh server is seeded with.

use std::collections::BTreeMap;

use canopy_types::{
    Achievement, AchievementId, AchievementKind, Location, LocationId, Rarity, Strain, StrainId,
    StrainType,
};

use crate::error::WorldError;

// ---------------------------------------------------------------------------
// Strain catalog
// ---------------------------------------------------------------------------

/// Validated, read-only index of strains by id.
#[derive(Debug, Clone, Default)]
pub struct StrainCatalog {
    strains: BTreeMap<StrainId, Strain>,
}

impl StrainCatalog {
    /// Build a catalog, rejecting inverted ranges and duplicate ids.
    pub fn from_strains(strains: Vec<Strain>) -> Result<Self, WorldError> {
        let mut index = BTreeMap::new();
        for strain in strains {
            validate_strain(&strain)?;
            let id = strain.id;
            if index.insert(id, strain).is_some() {
                return Err(WorldError::DuplicateStrain(id));
            }
        }
        Ok(Self { strains: index })
    }

    /// Iterate strains in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Strain> {
        self.strains.values()
    }

    /// Number of strains.
    pub fn len(&self) -> usize {
        self.strains.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.strains.is_empty()
    }
}

/// Check that every ranged pair on a strain satisfies `min <= max`.
pub fn validate_strain(strain: &Strain) -> Result<(), WorldError> {
    let inverted = |field| WorldError::InvertedRange {
        strain: strain.id,
        field,
    };
    if strain.thc_min > strain.thc_max {
        return Err(inverted("thc"));
    }
    if strain.yield_min > strain.yield_max {
        return Err(inverted("yield"));
    }
    if strain.flowering_time_min > strain.flowering_time_max {
        return Err(inverted("flowering_time"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Starter data
// ---------------------------------------------------------------------------

/// Compact form of a strain row used by the starter table.
struct StrainSeed {
    name: &'static str,
    strain_type: StrainType,
    thc: (f64, f64),
    grams: (f64, f64),
    days: (u32, u32),
    unlock_level: u32,
    seed_price: u64,
    rarity: Rarity,
}

const STARTER_STRAINS: &[StrainSeed] = &[
    StrainSeed {
        name: "Northern Lights",
        strain_type: StrainType::Indica,
        thc: (16.0, 21.0),
        grams: (35.0, 55.0),
        days: (7, 9),
        unlock_level: 1,
        seed_price: 20,
        rarity: Rarity::Common,
    },
    StrainSeed {
        name: "Blue Dream",
        strain_type: StrainType::Hybrid,
        thc: (17.0, 24.0),
        grams: (40.0, 60.0),
        days: (9, 10),
        unlock_level: 1,
        seed_price: 25,
        rarity: Rarity::Common,
    },
    StrainSeed {
        name: "Sour Diesel",
        strain_type: StrainType::Sativa,
        thc: (19.0, 25.0),
        grams: (30.0, 50.0),
        days: (10, 11),
        unlock_level: 3,
        seed_price: 40,
        rarity: Rarity::Uncommon,
    },
    StrainSeed {
        name: "Granddaddy Purple",
        strain_type: StrainType::Indica,
        thc: (17.0, 27.0),
        grams: (35.0, 55.0),
        days: (8, 11),
        unlock_level: 5,
        seed_price: 60,
        rarity: Rarity::Uncommon,
    },
    StrainSeed {
        name: "Jack Herer",
        strain_type: StrainType::Sativa,
        thc: (18.0, 24.0),
        grams: (45.0, 65.0),
        days: (8, 10),
        unlock_level: 8,
        seed_price: 90,
        rarity: Rarity::Rare,
    },
    StrainSeed {
        name: "Gorilla Glue",
        strain_type: StrainType::Hybrid,
        thc: (25.0, 30.0),
        grams: (50.0, 70.0),
        days: (8, 9),
        unlock_level: 12,
        seed_price: 150,
        rarity: Rarity::Legendary,
    },
];

/// The default strain catalog.
pub fn starter_strains() -> Vec<Strain> {
    STARTER_STRAINS
        .iter()
        .map(|s| Strain {
            id: StrainId::new(),
            name: s.name.to_owned(),
            strain_type: s.strain_type,
            thc_min: s.thc.0,
            thc_max: s.thc.1,
            yield_min: s.grams.0,
            yield_max: s.grams.1,
            flowering_time_min: s.days.0,
            flowering_time_max: s.days.1,
            unlock_level: s.unlock_level,
            seed_price: s.seed_price,
            rarity: s.rarity,
        })
        .collect()
}

/// The default locations, from a free backyard to a gated dispensary row.
pub fn starter_locations() -> Vec<Location> {
    let row = |name: &str, market_modifier, required_level, required_reputation, max_plants| {
        Location {
            id: LocationId::new(),
            name: name.to_owned(),
            market_modifier,
            required_level,
            required_reputation,
            max_plants,
        }
    };
    vec![
        row("Backyard Garden", 1.0, 1, 0, 4),
        row("Greenhouse", 1.15, 3, 150, 8),
        row("Hydroponic Lab", 1.3, 6, 300, 12),
        row("Dispensary Row", 1.5, 10, 600, 20),
    ]
}

/// The default achievement set.
pub fn starter_achievements() -> Vec<Achievement> {
    let row = |name: &str,
               description: &str,
               kind,
               requirement_value,
               reward_tokens,
               reward_experience| Achievement {
        id: AchievementId::new(),
        name: name.to_owned(),
        description: description.to_owned(),
        kind,
        requirement_value,
        reward_tokens,
        reward_experience,
        unlock_location_id: None,
    };
    vec![
        row("First Sale", "Sell your first harvest", AchievementKind::SalesMilestone, 1, 25, 50),
        row("Market Regular", "Complete 10 sales", AchievementKind::SalesMilestone, 10, 100, 250),
        row("Kingpin", "Complete 100 sales", AchievementKind::SalesMilestone, 100, 1000, 2000),
        row("Green Thumb", "Reach level 5", AchievementKind::LevelMilestone, 5, 100, 0),
        row("Master Grower", "Reach level 10", AchievementKind::LevelMilestone, 10, 250, 0),
        row("Pocket Money", "Earn 500 tokens", AchievementKind::TokensEarned, 500, 50, 100),
        row("High Roller", "Earn 10000 tokens", AchievementKind::TokensEarned, 10_000, 500, 1000),
        row("Collector", "Grow 3 different strains", AchievementKind::StrainCollection, 3, 75, 150),
        row("Botanist", "Grow 6 different strains", AchievementKind::StrainCollection, 6, 300, 500),
    ]
}
