//! Simulation rules for the Canopy cultivation game.
//!
//! Everything in this crate is synchronous and free of I/O: callers hand in
//! rows, the current time, the active weather and a random source, and get
//! mutated rows or computed outcomes back.

pub mod catalog;
pub mod error;
pub mod location;
pub mod market;
pub mod plant;
pub mod random;
pub mod weather;

// Re-export primary types at crate root.
pub use catalog::{StrainCatalog, starter_achievements, starter_locations, starter_strains};
pub use error::WorldError;
pub use location::AccessDenial;
pub use market::DEFAULT_PRICE_MODIFIER;
pub use plant::{Evaluation, HarvestOutcome, WaterOutcome};
pub use random::{FixedRandom, RandomSource, SeededRandom};
pub use weather::{Ailment, ClearSkies, WeatherBoard, WeatherProvider, WeatherSystem};
