//! Shared type definitions for the Canopy cultivation simulation.
//!
//! This crate is the single source of truth for the rows that flow between
//! the simulation crates, the data layer, and the web client. Types flow
//! downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`changes`] -- [`ChangeSet`], the batch of rows awaiting persistence
//! - [`ids`] -- Type-safe UUID wrappers for every row identifier
//! - [`enums`] -- Lifecycle stages, weather kinds, ledger and achievement types
//! - [`structs`] -- Entity rows (strains, players, plants, sales, ledger, ...)

pub mod changes;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use changes::ChangeSet;
pub use enums::{
    AchievementKind, Rarity, Season, Severity, Stage, StrainType, TransactionType, WeatherKind,
};
pub use ids::{
    AchievementId, LocationId, PlantId, PlayerId, SaleId, StrainId, TransactionId, UserId,
    WeatherEffectId,
};
pub use structs::{
    Achievement, GameTransaction, Location, MarketCondition, Plant, Player, PlayerAchievement,
    PricePoint, Sale, Strain, WeatherEffect,
};
