//! Server binary for the Canopy simulation.
//!
//! Wires the game service to its clock, weather board and random source,
//! seeds the starter catalog, then runs the background jobs until Ctrl-C.
//! With `infrastructure.postgres_url` set, the world is loaded from
//! `PostgreSQL` on boot and the store's outbox is flushed periodically.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `canopy-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the random source
//! 4. Create the store, hydrating it from `PostgreSQL` when configured
//! 5. Create the game service
//! 6. Seed the starter catalog
//! 7. Start the scheduler and the persistence loop
//! 8. Wait for Ctrl-C, stop every task, flush once more

mod error;
mod persist;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use canopy_core::config::InfrastructureConfig;
use canopy_core::{
    Clock, GameConfig, GameService, MemoryStore, Scheduler, Shutdown, SystemClock,
    price_history_floor,
};
use canopy_db::{PostgresConfig, PostgresPool, load_world};
use canopy_world::{
    RandomSource, SeededRandom, WeatherBoard, WeatherProvider, starter_achievements,
    starter_locations, starter_strains,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const CONFIG_PATH: &str = "canopy-config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let config_path =
        std::env::var("CANOPY_CONFIG").unwrap_or_else(|_unset| String::from(CONFIG_PATH));
    let config = GameConfig::from_file_or_default(Path::new(&config_path))
        .map_err(EngineError::from)
        .with_context(|| format!("loading {config_path}"))?;

    // 2. Initialize structured logging.
    init_tracing(&config);
    info!(
        config = %config_path,
        seed = ?config.world.seed,
        persistence = config.infrastructure.postgres_url.is_some(),
        "canopy-engine starting"
    );

    // 3. Random source.
    let rng = build_rng(config.world.seed);

    // 4. Store, hydrated from PostgreSQL when configured.
    let store = Arc::new(MemoryStore::new());
    let pool = match config.infrastructure.postgres_url.as_deref() {
        Some(url) => Some(open_database(url, &config.infrastructure, &store).await?),
        None => {
            info!("no postgres_url configured, running in memory only");
            None
        }
    };

    // 5. Game service.
    let board = Arc::new(WeatherBoard::new());
    let service = Arc::new(GameService::new(
        Arc::clone(&store),
        Arc::new(SystemClock),
        Arc::clone(&board) as Arc<dyn WeatherProvider>,
        rng,
        config.player.clone(),
    ));

    // 6. Starter catalog. Only empty tables are filled.
    if config.world.seed_starter_catalog {
        service
            .seed_catalog(starter_strains(), starter_locations(), starter_achievements())
            .map_err(EngineError::from)
            .context("seeding starter catalog")?;
    }

    // 7. Background jobs.
    let shutdown = Arc::new(Shutdown::new());
    let mut handles = Scheduler::new(
        Arc::clone(&service),
        board,
        config.schedule.clone(),
        Arc::clone(&shutdown),
    )
    .spawn();
    if let Some(pg) = &pool {
        handles.push(persist::spawn_persist_loop(
            Arc::clone(&store),
            pg.pool().clone(),
            config.schedule.persist_secs,
            Arc::clone(&shutdown),
        ));
    }
    info!(tasks = handles.len(), "canopy-engine running, press Ctrl-C to stop");

    // 8. Graceful shutdown.
    tokio::signal::ctrl_c()
        .await
        .map_err(EngineError::from)
        .context("waiting for Ctrl-C")?;
    shutdown.trigger();
    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "background task panicked");
        }
    }
    if let Some(pg) = pool {
        pg.close().await;
    }

    info!("canopy-engine stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_tracing(config: &GameConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_unset| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Seeded when `world.seed` is set so runs are reproducible.
fn build_rng(seed: Option<u64>) -> Box<dyn RandomSource> {
    seed.map_or_else(
        || Box::new(SeededRandom::from_os()) as Box<dyn RandomSource>,
        |seed| Box::new(SeededRandom::from_seed(seed)),
    )
}

/// Pool settings from the `infrastructure` section.
fn postgres_config(url: &str, infra: &InfrastructureConfig) -> PostgresConfig {
    PostgresConfig::new(url)
        .with_max_connections(infra.max_connections)
        .with_connect_timeout(Duration::from_secs(infra.connect_timeout_secs))
}

/// Connect, migrate and load the persisted world into `store`.
async fn open_database(
    url: &str,
    infra: &InfrastructureConfig,
    store: &MemoryStore,
) -> anyhow::Result<PostgresPool> {
    let pool = PostgresPool::connect(&postgres_config(url, infra))
        .await
        .map_err(EngineError::from)
        .context("connecting to PostgreSQL")?;
    pool.run_migrations()
        .await
        .map_err(EngineError::from)
        .context("running migrations")?;
    let world = load_world(pool.pool(), price_history_floor(SystemClock.now()))
        .await
        .map_err(EngineError::from)
        .context("loading world")?;
    store
        .hydrate(world)
        .map_err(EngineError::from)
        .context("hydrating store")?;
    Ok(pool)
}
