//! Flushing change sets to `PostgreSQL` and loading the world back.
//!
//! ```text
//! MemoryStore outbox --drain--> ChangeSet --flush_changes()--> PostgreSQL
//! PostgreSQL --load_world()--> ChangeSet --hydrate--> MemoryStore
//! ```
//!
//! Tables are written parents first (reference data, players, plants)
//! so foreign keys always resolve. Every write is an idempotent upsert or
//! an insert that skips existing ids, so a change set whose flush failed
//! halfway can be re-queued and flushed again whole.

use canopy_types::ChangeSet;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::catalog_store::CatalogStore;
use crate::error::DbError;
use crate::ledger_store::LedgerStore;
use crate::market_store::MarketStore;
use crate::plant_store::PlantStore;
use crate::player_store::PlayerStore;

// =========================================================================
// Error type
// =========================================================================

/// Errors that can occur while flushing or loading.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Writing one table failed.
    #[error("failed to write {table}: {source}")]
    Write {
        /// Table being written.
        table: &'static str,
        /// Underlying failure.
        #[source]
        source: DbError,
    },

    /// Reading one table failed.
    #[error("failed to load {table}: {source}")]
    Load {
        /// Table being read.
        table: &'static str,
        /// Underlying failure.
        #[source]
        source: DbError,
    },
}

fn write_failed(table: &'static str) -> impl FnOnce(DbError) -> PersistError {
    move |source| PersistError::Write { table, source }
}

fn load_failed(table: &'static str) -> impl FnOnce(DbError) -> PersistError {
    move |source| PersistError::Load { table, source }
}

// =========================================================================
// Flush
// =========================================================================

/// Write every row in `changes`. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`PersistError::Write`] naming the first table that failed.
/// Tables before it have been written; the caller should re-queue the
/// whole change set.
pub async fn flush_changes(pool: &PgPool, changes: &ChangeSet) -> Result<usize, PersistError> {
    if changes.is_empty() {
        return Ok(0);
    }

    let catalog = CatalogStore::new(pool);
    catalog
        .upsert_strains(&values(&changes.strains))
        .await
        .map_err(write_failed("strains"))?;
    catalog
        .upsert_locations(&values(&changes.locations))
        .await
        .map_err(write_failed("locations"))?;
    catalog
        .upsert_achievements(&values(&changes.achievements))
        .await
        .map_err(write_failed("achievements"))?;

    let players = PlayerStore::new(pool);
    players
        .upsert_players(&values(&changes.players))
        .await
        .map_err(write_failed("players"))?;

    let plants = PlantStore::new(pool);
    plants
        .upsert_plants(&values(&changes.plants))
        .await
        .map_err(write_failed("plants"))?;

    let market = MarketStore::new(pool);
    market
        .upsert_conditions(&values(&changes.market))
        .await
        .map_err(write_failed("market_conditions"))?;
    market
        .insert_price_points(&changes.price_history)
        .await
        .map_err(write_failed("price_history"))?;
    if let Some(cutoff) = changes.price_history_cutoff {
        let pruned = market
            .delete_price_history_before(cutoff)
            .await
            .map_err(write_failed("price_history"))?;
        tracing::debug!(pruned, %cutoff, "pruned price history");
    }

    plants
        .insert_sales(&changes.sales)
        .await
        .map_err(write_failed("sales"))?;
    players
        .insert_player_achievements(&changes.player_achievements)
        .await
        .map_err(write_failed("player_achievements"))?;
    LedgerStore::new(pool)
        .batch_insert(&changes.transactions)
        .await
        .map_err(write_failed("game_transactions"))?;

    let rows = changes.row_count();
    tracing::debug!(
        rows,
        players = changes.players.len(),
        plants = changes.plants.len(),
        sales = changes.sales.len(),
        transactions = changes.transactions.len(),
        "flushed changes to PostgreSQL"
    );
    Ok(rows)
}

fn values<K, V: Clone>(map: &std::collections::BTreeMap<K, V>) -> Vec<V> {
    map.values().cloned().collect()
}

// =========================================================================
// Load
// =========================================================================

/// Read every persisted row into a change set suitable for hydrating the
/// in-memory store. Price history older than `history_since` stays on disk.
pub async fn load_world(
    pool: &PgPool,
    history_since: DateTime<Utc>,
) -> Result<ChangeSet, PersistError> {
    let catalog = CatalogStore::new(pool);
    let players = PlayerStore::new(pool);
    let plants = PlantStore::new(pool);

    let mut world = ChangeSet::default();

    for strain in catalog.load_strains().await.map_err(load_failed("strains"))? {
        world.strains.insert(strain.id, strain);
    }
    for location in catalog
        .load_locations()
        .await
        .map_err(load_failed("locations"))?
    {
        world.locations.insert(location.id, location);
    }
    for achievement in catalog
        .load_achievements()
        .await
        .map_err(load_failed("achievements"))?
    {
        world.achievements.insert(achievement.id, achievement);
    }
    for player in players.load_players().await.map_err(load_failed("players"))? {
        world.players.insert(player.id, player);
    }
    for plant in plants.load_plants().await.map_err(load_failed("plants"))? {
        world.plants.insert(plant.id, plant);
    }
    let market = MarketStore::new(pool);
    for condition in market
        .load_conditions()
        .await
        .map_err(load_failed("market_conditions"))?
    {
        world
            .market
            .insert((condition.location_id, condition.strain_id), condition);
    }
    world.price_history = market
        .load_price_history(history_since)
        .await
        .map_err(load_failed("price_history"))?;
    world.sales = plants.load_sales().await.map_err(load_failed("sales"))?;
    world.player_achievements = players
        .load_player_achievements()
        .await
        .map_err(load_failed("player_achievements"))?;
    world.transactions = LedgerStore::new(pool)
        .load_all()
        .await
        .map_err(load_failed("game_transactions"))?;

    tracing::info!(
        strains = world.strains.len(),
        locations = world.locations.len(),
        players = world.players.len(),
        plants = world.plants.len(),
        sales = world.sales.len(),
        price_points = world.price_history.len(),
        transactions = world.transactions.len(),
        "loaded world from PostgreSQL"
    );
    Ok(world)
}
