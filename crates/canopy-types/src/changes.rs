//! Batches of changed rows awaiting persistence.
//!
//! The in-memory store records every row it writes into a [`ChangeSet`];
//! the persistence loop drains it and hands it to the database layer.
//! Mutable rows (players, plants, market rows, reference data) are keyed so
//! that only the latest version is flushed. Append-only rows (sales, earned
//! achievements, ledger entries, price history) are kept in insertion order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::ids::{AchievementId, LocationId, PlantId, PlayerId, StrainId};
use crate::structs::{
    Achievement, GameTransaction, Location, MarketCondition, Plant, Player, PlayerAchievement,
    PricePoint, Sale, Strain,
};

/// Rows written since the last flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Strain catalog rows.
    pub strains: BTreeMap<StrainId, Strain>,
    /// Location rows.
    pub locations: BTreeMap<LocationId, Location>,
    /// Achievement definitions.
    pub achievements: BTreeMap<AchievementId, Achievement>,
    /// Latest version of each changed player.
    pub players: BTreeMap<PlayerId, Player>,
    /// Latest version of each changed plant.
    pub plants: BTreeMap<PlantId, Plant>,
    /// Latest version of each changed market row.
    pub market: BTreeMap<(LocationId, StrainId), MarketCondition>,
    /// New sales.
    pub sales: Vec<Sale>,
    /// Newly earned achievements.
    pub player_achievements: Vec<PlayerAchievement>,
    /// New ledger entries.
    pub transactions: Vec<GameTransaction>,
    /// New price history points.
    pub price_history: Vec<PricePoint>,
    /// Price history recorded before this instant has been pruned.
    pub price_history_cutoff: Option<DateTime<Utc>>,
}

impl ChangeSet {
    /// Whether there is nothing to flush.
    pub fn is_empty(&self) -> bool {
        self.strains.is_empty()
            && self.locations.is_empty()
            && self.achievements.is_empty()
            && self.players.is_empty()
            && self.plants.is_empty()
            && self.market.is_empty()
            && self.sales.is_empty()
            && self.player_achievements.is_empty()
            && self.transactions.is_empty()
            && self.price_history.is_empty()
            && self.price_history_cutoff.is_none()
    }

    /// Total number of rows in the batch.
    pub fn row_count(&self) -> usize {
        [
            self.strains.len(),
            self.locations.len(),
            self.achievements.len(),
            self.players.len(),
            self.plants.len(),
            self.market.len(),
            self.sales.len(),
            self.player_achievements.len(),
            self.transactions.len(),
            self.price_history.len(),
        ]
        .iter()
        .fold(0_usize, |acc, n| acc.saturating_add(*n))
    }

    /// Fold an older, unflushed batch back in underneath this one.
    ///
    /// Keyed rows already present in `self` are newer and win. Append-only
    /// rows from `older` are placed before this batch's rows.
    pub fn merge_older(&mut self, older: Self) {
        fn keep_newer<K: Ord, V>(newer: &mut BTreeMap<K, V>, older: BTreeMap<K, V>) {
            for (key, value) in older {
                newer.entry(key).or_insert(value);
            }
        }
        fn prepend<T>(newer: &mut Vec<T>, mut older: Vec<T>) {
            older.append(newer);
            *newer = older;
        }

        keep_newer(&mut self.strains, older.strains);
        keep_newer(&mut self.locations, older.locations);
        keep_newer(&mut self.achievements, older.achievements);
        keep_newer(&mut self.players, older.players);
        keep_newer(&mut self.plants, older.plants);
        keep_newer(&mut self.market, older.market);
        prepend(&mut self.sales, older.sales);
        prepend(&mut self.player_achievements, older.player_achievements);
        prepend(&mut self.transactions, older.transactions);
        prepend(&mut self.price_history, older.price_history);
        self.price_history_cutoff = self.price_history_cutoff.max(older.price_history_cutoff);
    }
}
