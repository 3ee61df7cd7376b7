//! Row storage behind the game service.
//!
//! [`GameStore`] is the data-store seam: row-level get, insert, upsert and
//! atomic read-modify-write. Updates take a closure that runs against a
//! copy of the row while the row's lock is held; the copy is written back
//! only if the closure succeeds, so a failed spend or an illegal transition
//! leaves the stored row untouched.
//!
//! [`MemoryStore`] keeps every table in memory. Each player, plant and
//! market row has its own lock, so operations on different rows proceed
//! concurrently while operations on one row are serialized. Every write is
//! also recorded in an outbox ([`ChangeSet`]) that the engine drains into
//! `PostgreSQL`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use canopy_ledger::Ledger;
use canopy_types::{
    Achievement, AchievementId, ChangeSet, Location, LocationId, MarketCondition, Plant, PlantId,
    Player, PlayerAchievement, PlayerId, PricePoint, Sale, Strain, StrainId, UserId,
};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Row-level access to every table the game service touches.
pub trait GameStore: Send + Sync {
    // --- Reference data ---

    /// Look up a strain.
    fn strain(&self, id: StrainId) -> Result<Strain, StoreError>;
    /// Every strain in the catalog.
    fn strains(&self) -> Result<Vec<Strain>, StoreError>;
    /// Add or replace a strain.
    fn upsert_strain(&self, strain: Strain) -> Result<(), StoreError>;
    /// Look up a location.
    fn location(&self, id: LocationId) -> Result<Location, StoreError>;
    /// Every location.
    fn locations(&self) -> Result<Vec<Location>, StoreError>;
    /// Add or replace a location.
    fn upsert_location(&self, location: Location) -> Result<(), StoreError>;
    /// Every achievement definition.
    fn achievements(&self) -> Result<Vec<Achievement>, StoreError>;
    /// Add or replace an achievement definition.
    fn upsert_achievement(&self, achievement: Achievement) -> Result<(), StoreError>;

    // --- Players ---

    /// Look up a player.
    fn player(&self, id: PlayerId) -> Result<Player, StoreError>;
    /// The player owned by a user, if provisioned.
    fn player_by_user(&self, user_id: UserId) -> Result<Option<Player>, StoreError>;
    /// Every player.
    fn players(&self) -> Result<Vec<Player>, StoreError>;
    /// Return the user's player, inserting `make()` first if there is none.
    ///
    /// At most one player is ever created per user, even under concurrent
    /// calls.
    fn get_or_insert_player(
        &self,
        user_id: UserId,
        make: impl FnOnce() -> Player,
    ) -> Result<Player, StoreError>;
    /// Atomically read-modify-write one player.
    fn update_player<T, E: From<StoreError>>(
        &self,
        id: PlayerId,
        f: impl FnOnce(&mut Player) -> Result<T, E>,
    ) -> Result<T, E>;

    // --- Plants ---

    /// Look up a plant.
    fn plant(&self, id: PlantId) -> Result<Plant, StoreError>;
    /// Every plant a player has ever sown.
    fn plants_for_player(&self, player_id: PlayerId) -> Result<Vec<Plant>, StoreError>;
    /// Ids of every plant still in the ground.
    fn growing_plant_ids(&self) -> Result<Vec<PlantId>, StoreError>;
    /// Insert a freshly sown plant.
    fn insert_plant(&self, plant: Plant) -> Result<(), StoreError>;
    /// Atomically read-modify-write one plant.
    fn update_plant<T, E: From<StoreError>>(
        &self,
        id: PlantId,
        f: impl FnOnce(&mut Plant) -> Result<T, E>,
    ) -> Result<T, E>;

    // --- Sales ---

    /// Insert a sale. Fails with [`StoreError::Duplicate`] if the plant was
    /// already sold.
    fn insert_sale(&self, sale: Sale) -> Result<(), StoreError>;
    /// Number of sales a player has made.
    fn sale_count(&self, player_id: PlayerId) -> Result<usize, StoreError>;
    /// Every sale a player has made.
    fn sales_for_player(&self, player_id: PlayerId) -> Result<Vec<Sale>, StoreError>;

    // --- Market ---

    /// The market row for a pair, if one has been drawn.
    fn market_condition(
        &self,
        location_id: LocationId,
        strain_id: StrainId,
    ) -> Result<Option<MarketCondition>, StoreError>;
    /// Every market row at a location.
    fn market_for_location(
        &self,
        location_id: LocationId,
    ) -> Result<Vec<MarketCondition>, StoreError>;
    /// Create or overwrite a market row.
    fn upsert_market(&self, condition: MarketCondition) -> Result<(), StoreError>;
    /// Append a point to the price history.
    fn record_price_point(&self, point: PricePoint) -> Result<(), StoreError>;
    /// History for a strain recorded at or after `since`, oldest first.
    /// `None` covers every location.
    fn price_history(
        &self,
        strain_id: StrainId,
        location_id: Option<LocationId>,
        since: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, StoreError>;
    /// Drop history recorded before `before`. Returns how many points went.
    fn prune_price_history(&self, before: DateTime<Utc>) -> Result<usize, StoreError>;

    // --- Achievements earned ---

    /// Achievements a player has already earned.
    fn earned_achievements(
        &self,
        player_id: PlayerId,
    ) -> Result<BTreeSet<AchievementId>, StoreError>;
    /// Record an earned achievement. Returns `false` if it was already
    /// recorded for this player.
    fn insert_player_achievement(&self, row: PlayerAchievement) -> Result<bool, StoreError>;

    // --- Ledger ---

    /// Run `f` with exclusive access to the ledger. New entries are queued
    /// for persistence.
    fn with_ledger<T>(&self, f: impl FnOnce(&mut Ledger) -> T) -> Result<T, StoreError>;

    // --- Outbox ---

    /// Take every row written since the last drain.
    fn drain_changes(&self) -> Result<ChangeSet, StoreError>;
    /// Put back a drained batch that could not be persisted.
    fn requeue(&self, changes: ChangeSet) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Row table
// ---------------------------------------------------------------------------

/// A table of individually locked rows.
#[derive(Debug)]
struct Table<K, V> {
    name: &'static str,
    rows: RwLock<BTreeMap<K, Arc<Mutex<V>>>>,
}

impl<K: Ord + Copy + Debug, V: Clone> Table<K, V> {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    const fn poisoned(&self) -> StoreError {
        StoreError::Poisoned { table: self.name }
    }

    fn missing(&self, key: K) -> StoreError {
        StoreError::Missing {
            table: self.name,
            id: format!("{key:?}"),
        }
    }

    fn row(&self, key: K) -> Result<Arc<Mutex<V>>, StoreError> {
        let rows = self.rows.read().map_err(|_poisoned| self.poisoned())?;
        rows.get(&key).cloned().ok_or_else(|| self.missing(key))
    }

    fn get(&self, key: K) -> Result<V, StoreError> {
        let row = self.row(key)?;
        let value = row.lock().map_err(|_poisoned| self.poisoned())?;
        Ok(value.clone())
    }

    fn find(&self, key: K) -> Result<Option<V>, StoreError> {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::Missing { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn filter(&self, mut keep: impl FnMut(&V) -> bool) -> Result<Vec<V>, StoreError> {
        let rows = self.rows.read().map_err(|_poisoned| self.poisoned())?;
        let mut out = Vec::new();
        for row in rows.values() {
            let value = row.lock().map_err(|_poisoned| self.poisoned())?;
            if keep(&value) {
                out.push(value.clone());
            }
        }
        Ok(out)
    }

    fn all(&self) -> Result<Vec<V>, StoreError> {
        self.filter(|_| true)
    }

    fn insert(&self, key: K, value: V) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_poisoned| self.poisoned())?;
        if rows.contains_key(&key) {
            return Err(StoreError::Duplicate {
                table: self.name,
                id: format!("{key:?}"),
            });
        }
        rows.insert(key, Arc::new(Mutex::new(value)));
        Ok(())
    }

    /// Insert or overwrite. `on_write` runs while the row is locked.
    fn upsert(&self, key: K, value: V, on_write: impl FnOnce(&V)) -> Result<(), StoreError> {
        let existing = {
            let mut rows = self.rows.write().map_err(|_poisoned| self.poisoned())?;
            let Some(row) = rows.get(&key).cloned() else {
                on_write(&value);
                rows.insert(key, Arc::new(Mutex::new(value)));
                return Ok(());
            };
            row
        };
        let mut current = existing.lock().map_err(|_poisoned| self.poisoned())?;
        on_write(&value);
        *current = value;
        Ok(())
    }

    /// Read-modify-write one row. `on_write` runs while the row is locked.
    fn update<T, E: From<StoreError>>(
        &self,
        key: K,
        f: impl FnOnce(&mut V) -> Result<T, E>,
        on_write: impl FnOnce(&V),
    ) -> Result<T, E> {
        let row = self.row(key)?;
        let mut current = row.lock().map_err(|_poisoned| self.poisoned())?;
        let mut draft = current.clone();
        let out = f(&mut draft)?;
        on_write(&draft);
        *current = draft;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory [`GameStore`] with an outbox of changed rows.
#[derive(Debug)]
pub struct MemoryStore {
    strains: Table<StrainId, Strain>,
    locations: Table<LocationId, Location>,
    achievements: Table<AchievementId, Achievement>,
    players: Table<PlayerId, Player>,
    users: RwLock<BTreeMap<UserId, PlayerId>>,
    plants: Table<PlantId, Plant>,
    market: Table<(LocationId, StrainId), MarketCondition>,
    price_history: RwLock<Vec<PricePoint>>,
    /// One sale per plant.
    sales: RwLock<BTreeMap<PlantId, Sale>>,
    earned: RwLock<BTreeSet<(PlayerId, AchievementId)>>,
    ledger: Mutex<Ledger>,
    outbox: Mutex<ChangeSet>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            strains: Table::new("strain"),
            locations: Table::new("location"),
            achievements: Table::new("achievement"),
            players: Table::new("player"),
            users: RwLock::new(BTreeMap::new()),
            plants: Table::new("plant"),
            market: Table::new("market_condition"),
            price_history: RwLock::new(Vec::new()),
            sales: RwLock::new(BTreeMap::new()),
            earned: RwLock::new(BTreeSet::new()),
            ledger: Mutex::new(Ledger::new()),
            outbox: Mutex::new(ChangeSet::default()),
        }
    }

    /// Load previously persisted rows without queueing them for persistence.
    pub fn hydrate(&self, rows: ChangeSet) -> Result<(), StoreError> {
        for (id, strain) in rows.strains {
            self.strains.upsert(id, strain, noop)?;
        }
        for (id, location) in rows.locations {
            self.locations.upsert(id, location, noop)?;
        }
        for (id, achievement) in rows.achievements {
            self.achievements.upsert(id, achievement, noop)?;
        }
        {
            let mut users = self.users.write().map_err(|_poisoned| poisoned("player"))?;
            for (id, player) in rows.players {
                users.insert(player.user_id, id);
                self.players.upsert(id, player, noop)?;
            }
        }
        for (id, plant) in rows.plants {
            self.plants.upsert(id, plant, noop)?;
        }
        for (key, condition) in rows.market {
            self.market.upsert(key, condition, noop)?;
        }
        {
            let mut history = self
                .price_history
                .write()
                .map_err(|_poisoned| poisoned("price_history"))?;
            history.extend(rows.price_history);
            history.sort_by_key(|p| p.recorded_at);
        }
        {
            let mut sales = self.sales.write().map_err(|_poisoned| poisoned("sale"))?;
            for sale in rows.sales {
                sales.insert(sale.plant_id, sale);
            }
        }
        {
            let mut earned = self
                .earned
                .write()
                .map_err(|_poisoned| poisoned("player_achievement"))?;
            for row in rows.player_achievements {
                earned.insert((row.player_id, row.achievement_id));
            }
        }
        let mut ledger = self.ledger.lock().map_err(|_poisoned| poisoned("game_transaction"))?;
        for entry in rows.transactions {
            ledger.append(entry);
        }
        tracing::info!(ledger_entries = ledger.len(), "store hydrated");
        Ok(())
    }

    fn record(&self, f: impl FnOnce(&mut ChangeSet)) {
        match self.outbox.lock() {
            Ok(mut outbox) => f(&mut outbox),
            Err(_poisoned) => tracing::error!("outbox lock poisoned, change will not be persisted"),
        }
    }
}

const fn poisoned(table: &'static str) -> StoreError {
    StoreError::Poisoned { table }
}

impl GameStore for MemoryStore {
    fn strain(&self, id: StrainId) -> Result<Strain, StoreError> {
        self.strains.get(id)
    }

    fn strains(&self) -> Result<Vec<Strain>, StoreError> {
        self.strains.all()
    }

    fn upsert_strain(&self, strain: Strain) -> Result<(), StoreError> {
        self.strains.upsert(strain.id, strain, |row| {
            self.record(|c| {
                c.strains.insert(row.id, row.clone());
            });
        })
    }

    fn location(&self, id: LocationId) -> Result<Location, StoreError> {
        self.locations.get(id)
    }

    fn locations(&self) -> Result<Vec<Location>, StoreError> {
        self.locations.all()
    }

    fn upsert_location(&self, location: Location) -> Result<(), StoreError> {
        self.locations.upsert(location.id, location, |row| {
            self.record(|c| {
                c.locations.insert(row.id, row.clone());
            });
        })
    }

    fn achievements(&self) -> Result<Vec<Achievement>, StoreError> {
        self.achievements.all()
    }

    fn upsert_achievement(&self, achievement: Achievement) -> Result<(), StoreError> {
        self.achievements.upsert(achievement.id, achievement, |row| {
            self.record(|c| {
                c.achievements.insert(row.id, row.clone());
            });
        })
    }

    fn player(&self, id: PlayerId) -> Result<Player, StoreError> {
        self.players.get(id)
    }

    fn player_by_user(&self, user_id: UserId) -> Result<Option<Player>, StoreError> {
        let id = {
            let users = self.users.read().map_err(|_poisoned| poisoned("player"))?;
            users.get(&user_id).copied()
        };
        match id {
            Some(id) => self.players.find(id),
            None => Ok(None),
        }
    }

    fn players(&self) -> Result<Vec<Player>, StoreError> {
        self.players.all()
    }

    fn get_or_insert_player(
        &self,
        user_id: UserId,
        make: impl FnOnce() -> Player,
    ) -> Result<Player, StoreError> {
        let mut users = self.users.write().map_err(|_poisoned| poisoned("player"))?;
        if let Some(id) = users.get(&user_id) {
            return self.players.get(*id);
        }
        let player = make();
        self.players.insert(player.id, player.clone())?;
        users.insert(user_id, player.id);
        self.record(|c| {
            c.players.insert(player.id, player.clone());
        });
        Ok(player)
    }

    fn update_player<T, E: From<StoreError>>(
        &self,
        id: PlayerId,
        f: impl FnOnce(&mut Player) -> Result<T, E>,
    ) -> Result<T, E> {
        self.players.update(id, f, |row| {
            self.record(|c| {
                c.players.insert(row.id, row.clone());
            });
        })
    }

    fn plant(&self, id: PlantId) -> Result<Plant, StoreError> {
        self.plants.get(id)
    }

    fn plants_for_player(&self, player_id: PlayerId) -> Result<Vec<Plant>, StoreError> {
        self.plants.filter(|p| p.player_id == player_id)
    }

    fn growing_plant_ids(&self) -> Result<Vec<PlantId>, StoreError> {
        Ok(self
            .plants
            .filter(|p| p.stage.is_growing())?
            .into_iter()
            .map(|p| p.id)
            .collect())
    }

    fn insert_plant(&self, plant: Plant) -> Result<(), StoreError> {
        self.plants.insert(plant.id, plant.clone())?;
        self.record(|c| {
            c.plants.insert(plant.id, plant);
        });
        Ok(())
    }

    fn update_plant<T, E: From<StoreError>>(
        &self,
        id: PlantId,
        f: impl FnOnce(&mut Plant) -> Result<T, E>,
    ) -> Result<T, E> {
        self.plants.update(id, f, |row| {
            self.record(|c| {
                c.plants.insert(row.id, row.clone());
            });
        })
    }

    fn insert_sale(&self, sale: Sale) -> Result<(), StoreError> {
        let mut sales = self.sales.write().map_err(|_poisoned| poisoned("sale"))?;
        if sales.contains_key(&sale.plant_id) {
            return Err(StoreError::Duplicate {
                table: "sale",
                id: sale.plant_id.to_string(),
            });
        }
        sales.insert(sale.plant_id, sale.clone());
        self.record(|c| c.sales.push(sale));
        Ok(())
    }

    fn sale_count(&self, player_id: PlayerId) -> Result<usize, StoreError> {
        let sales = self.sales.read().map_err(|_poisoned| poisoned("sale"))?;
        Ok(sales.values().filter(|s| s.player_id == player_id).count())
    }

    fn sales_for_player(&self, player_id: PlayerId) -> Result<Vec<Sale>, StoreError> {
        let sales = self.sales.read().map_err(|_poisoned| poisoned("sale"))?;
        let mut out: Vec<Sale> = sales
            .values()
            .filter(|s| s.player_id == player_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.sold_at);
        Ok(out)
    }

    fn market_condition(
        &self,
        location_id: LocationId,
        strain_id: StrainId,
    ) -> Result<Option<MarketCondition>, StoreError> {
        self.market.find((location_id, strain_id))
    }

    fn market_for_location(
        &self,
        location_id: LocationId,
    ) -> Result<Vec<MarketCondition>, StoreError> {
        self.market.filter(|m| m.location_id == location_id)
    }

    fn upsert_market(&self, condition: MarketCondition) -> Result<(), StoreError> {
        let key = (condition.location_id, condition.strain_id);
        self.market.upsert(key, condition, |row| {
            self.record(|c| {
                c.market.insert(key, row.clone());
            });
        })
    }

    fn record_price_point(&self, point: PricePoint) -> Result<(), StoreError> {
        let mut history = self
            .price_history
            .write()
            .map_err(|_poisoned| poisoned("price_history"))?;
        history.push(point.clone());
        self.record(|c| c.price_history.push(point));
        Ok(())
    }

    fn price_history(
        &self,
        strain_id: StrainId,
        location_id: Option<LocationId>,
        since: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, StoreError> {
        let history = self
            .price_history
            .read()
            .map_err(|_poisoned| poisoned("price_history"))?;
        let mut out: Vec<PricePoint> = history
            .iter()
            .filter(|p| {
                p.strain_id == strain_id
                    && p.recorded_at >= since
                    && location_id.is_none_or(|id| p.location_id == id)
            })
            .cloned()
            .collect();
        out.sort_by_key(|p| p.recorded_at);
        Ok(out)
    }

    fn prune_price_history(&self, before: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut history = self
            .price_history
            .write()
            .map_err(|_poisoned| poisoned("price_history"))?;
        let count = history.len();
        history.retain(|p| p.recorded_at >= before);
        self.record(|c| {
            c.price_history.retain(|p| p.recorded_at >= before);
            c.price_history_cutoff = c.price_history_cutoff.max(Some(before));
        });
        Ok(count.saturating_sub(history.len()))
    }

    fn earned_achievements(
        &self,
        player_id: PlayerId,
    ) -> Result<BTreeSet<AchievementId>, StoreError> {
        let earned = self
            .earned
            .read()
            .map_err(|_poisoned| poisoned("player_achievement"))?;
        Ok(earned
            .iter()
            .filter(|(player, _)| *player == player_id)
            .map(|(_, achievement)| *achievement)
            .collect())
    }

    fn insert_player_achievement(&self, row: PlayerAchievement) -> Result<bool, StoreError> {
        let mut earned = self
            .earned
            .write()
            .map_err(|_poisoned| poisoned("player_achievement"))?;
        if !earned.insert((row.player_id, row.achievement_id)) {
            return Ok(false);
        }
        self.record(|c| c.player_achievements.push(row));
        Ok(true)
    }

    fn with_ledger<T>(&self, f: impl FnOnce(&mut Ledger) -> T) -> Result<T, StoreError> {
        let mut ledger = self
            .ledger
            .lock()
            .map_err(|_poisoned| poisoned("game_transaction"))?;
        let cursor = ledger.len();
        let out = f(&mut ledger);
        let fresh = ledger.entries_since(cursor);
        if !fresh.is_empty() {
            self.record(|c| c.transactions.extend_from_slice(fresh));
        }
        Ok(out)
    }

    fn drain_changes(&self) -> Result<ChangeSet, StoreError> {
        let mut outbox = self.outbox.lock().map_err(|_poisoned| poisoned("outbox"))?;
        Ok(std::mem::take(&mut *outbox))
    }

    fn requeue(&self, changes: ChangeSet) -> Result<(), StoreError> {
        let mut outbox = self.outbox.lock().map_err(|_poisoned| poisoned("outbox"))?;
        outbox.merge_older(changes);
        Ok(())
    }
}

/// `on_write` hook for rows that are already persisted.
const fn noop<V>(_: &V) {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use canopy_players::new_player;

    use super::*;

    fn store_with_player() -> (MemoryStore, Player) {
        let store = MemoryStore::new();
        let user = UserId::new();
        let player = store
            .get_or_insert_player(user, || new_player(user, 100, 100, Utc::now()))
            .unwrap();
        (store, player)
    }

    #[test]
    fn one_player_per_user() {
        let (store, first) = store_with_player();
        let again = store
            .get_or_insert_player(first.user_id, || new_player(first.user_id, 5, 5, Utc::now()))
            .unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.tokens, 100);
        assert_eq!(store.players().unwrap().len(), 1);
    }

    #[test]
    fn failed_update_leaves_row_untouched() {
        let (store, player) = store_with_player();
        let result: Result<(), StoreError> = store.update_player(player.id, |p| {
            p.tokens = 0;
            Err(StoreError::Poisoned { table: "test" })
        });
        assert!(result.is_err());
        assert_eq!(store.player(player.id).unwrap().tokens, 100);
    }

    #[test]
    fn update_missing_row_is_missing() {
        let store = MemoryStore::new();
        let result: Result<(), StoreError> = store.update_player(PlayerId::new(), |_| Ok(()));
        assert!(matches!(result, Err(StoreError::Missing { table: "player", .. })));
    }

    #[test]
    fn player_achievement_insert_is_idempotent() {
        let (store, player) = store_with_player();
        let row = PlayerAchievement {
            player_id: player.id,
            achievement_id: AchievementId::new(),
            earned_at: Utc::now(),
        };
        assert!(store.insert_player_achievement(row.clone()).unwrap());
        assert!(!store.insert_player_achievement(row).unwrap());
        assert_eq!(store.earned_achievements(player.id).unwrap().len(), 1);
    }

    #[test]
    fn outbox_collects_writes_and_drains() {
        let (store, player) = store_with_player();
        store
            .update_player(player.id, |p| {
                p.tokens = 42;
                Ok::<_, StoreError>(())
            })
            .unwrap();
        let recorded = store
            .with_ledger(|ledger| {
                ledger
                    .record_purchase(player.id, 5, "grant".to_owned(), Utc::now())
                    .is_ok()
            })
            .unwrap();
        assert!(recorded);

        let changes = store.drain_changes().unwrap();
        assert_eq!(changes.players.get(&player.id).map(|p| p.tokens), Some(42));
        assert_eq!(changes.transactions.len(), 1);
        assert!(store.drain_changes().unwrap().is_empty());

        store.requeue(changes).unwrap();
        assert_eq!(store.drain_changes().unwrap().transactions.len(), 1);
    }

    #[test]
    fn price_history_filters_and_prunes() {
        let store = MemoryStore::new();
        let strain = StrainId::new();
        let yard = LocationId::new();
        let now = Utc::now();
        let point = |location_id, days_ago| PricePoint {
            location_id,
            strain_id: strain,
            price_modifier: 1.0,
            supply_level: 1.0,
            demand_level: 1.0,
            recorded_at: now - chrono::Duration::days(days_ago),
        };
        store.record_price_point(point(yard, 1)).unwrap();
        store.record_price_point(point(yard, 40)).unwrap();
        store.record_price_point(point(LocationId::new(), 2)).unwrap();

        let week = now - chrono::Duration::days(7);
        assert_eq!(store.price_history(strain, Some(yard), week).unwrap().len(), 1);
        let everywhere = store.price_history(strain, None, week).unwrap();
        assert_eq!(everywhere.len(), 2);
        assert!(everywhere.first().map(|p| p.recorded_at) < everywhere.last().map(|p| p.recorded_at));

        assert_eq!(store.prune_price_history(now - chrono::Duration::days(30)).unwrap(), 1);
        let changes = store.drain_changes().unwrap();
        assert_eq!(changes.price_history.len(), 2);
        assert!(changes.price_history_cutoff.is_some());
    }

    #[test]
    fn hydrate_does_not_queue_rows() {
        let store = MemoryStore::new();
        let user = UserId::new();
        let player = new_player(user, 10, 0, Utc::now());
        let mut rows = ChangeSet::default();
        rows.players.insert(player.id, player.clone());

        store.hydrate(rows).unwrap();
        assert!(store.drain_changes().unwrap().is_empty());
        assert_eq!(store.player_by_user(user).unwrap().map(|p| p.id), Some(player.id));
    }
}
