//! Game service, row store, and scheduling for the Canopy simulation.
//!
//! This crate turns the pure rules of `canopy-world` and `canopy-players`
//! into the operations a client calls: provisioning players, planting,
//! watering, harvesting, selling, and checking achievements. It also owns
//! the background jobs that move the world forward.
//!
//! # Modules
//!
//! - [`clock`] -- [`Clock`] trait, wall clock, and a manual clock for tests.
//! - [`config`] -- Configuration loading from `canopy-config.yaml`.
//! - [`error`] -- [`GameError`] and [`StoreError`].
//! - [`scheduler`] -- Market sweep, plant tick and weather cycle loops.
//! - [`service`] -- [`GameService`], the operation surface.
//! - [`store`] -- [`GameStore`] trait and the in-memory [`MemoryStore`].

pub mod clock;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, GameConfig};
pub use error::{GameError, StoreError};
pub use scheduler::{Scheduler, Shutdown};
pub use service::{GameService, SaleOutcome, SeedReport, price_history_floor};
pub use store::{GameStore, MemoryStore};
