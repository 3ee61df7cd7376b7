//! `PostgreSQL` persistence for the Canopy simulation.
//!
//! The engine keeps the live world in memory and periodically flushes the
//! rows it changed. On startup the whole world is loaded back.
//!
//! # Architecture
//!
//! ```text
//! GameService
//!     |
//!     +-- reads/writes ------> MemoryStore (outbox of changed rows)
//!     |
//!     +-- persist loop ------> flush_changes() --> PostgreSQL (PostgresPool)
//!         |-- CatalogStore   (strains, locations, achievements)
//!         |-- PlayerStore    (players, player_achievements)
//!         |-- PlantStore     (plants, sales)
//!         |-- MarketStore    (market_conditions, price_history)
//!         +-- LedgerStore    (game_transactions, append-only)
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- connection pool, configuration and migrations
//! - [`catalog_store`] -- reference data
//! - [`player_store`] -- players and earned achievements
//! - [`plant_store`] -- plants and sales
//! - [`market_store`] -- market rows and price history
//! - [`ledger_store`] -- batch ledger insertion and queries
//! - [`persist`] -- change-set flush and world load
//! - [`error`] -- shared error types

mod codec;

pub mod catalog_store;
pub mod error;
pub mod ledger_store;
pub mod market_store;
pub mod persist;
pub mod plant_store;
pub mod player_store;
pub mod postgres;

pub use catalog_store::CatalogStore;
pub use error::DbError;
pub use ledger_store::{LedgerRow, LedgerStore};
pub use market_store::MarketStore;
pub use persist::{PersistError, flush_changes, load_world};
pub use plant_store::PlantStore;
pub use player_store::PlayerStore;
pub use postgres::{PostgresConfig, PostgresPool};
