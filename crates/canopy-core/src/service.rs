//! The game service: every player action and scheduled job.
//!
//! [`GameService`] ties the pure rules in `canopy-world` and
//! `canopy-players` to a [`GameStore`], a [`Clock`], a [`WeatherProvider`]
//! and a [`RandomSource`]. Each operation reads the rows it needs, applies
//! a rule inside the store's per-row atomic update, and appends the
//! matching ledger entries.
//!
//! # Ledger writes
//!
//! Token amounts are checked against the ledger's range before any row is
//! mutated. The entries themselves are appended after the balance change;
//! an append failure is logged and never rolls the balance back.
//!
//! # Lock order
//!
//! Player row, then plant rows, then the ledger, then the random source.
//! No operation takes a player lock while holding a plant lock.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use canopy_ledger::{LedgerError, ReconcileResult, reconcile::reconcile_balances};
use canopy_players::{
    AchievementProgress, LevelUp, adjust_reputation, apply_experience, credit_tokens,
    debit_tokens, new_player, newly_met, quote, to_sale, unlock_location,
};
use canopy_types::{
    Achievement, GameTransaction, Location, LocationId, MarketCondition, Plant, PlantId,
    Player, PlayerAchievement, PlayerId, PricePoint, Sale, Strain, StrainId, UserId,
    WeatherEffect, WeatherEffectId,
};
use canopy_world::{
    Ailment, DEFAULT_PRICE_MODIFIER, Evaluation, HarvestOutcome, RandomSource, StrainCatalog,
    WaterOutcome, WeatherBoard, WeatherProvider, WeatherSystem, location, market, plant, weather,
};

use crate::clock::Clock;
use crate::config::PlayerConfig;
use crate::error::{GameError, StoreError};
use crate::store::GameStore;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Everything a successful sale produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleOutcome {
    /// The immutable sale row.
    pub sale: Sale,
    /// Tokens credited to the seller.
    pub tokens: u64,
    /// Level-up triggered by the sale's experience, if any.
    pub level_up: Option<LevelUp>,
    /// Achievements earned as a result of the sale.
    pub achievements: Vec<Achievement>,
}

/// Days of price history kept by the market sweep.
pub const PRICE_HISTORY_RETENTION_DAYS: i64 = 30;

/// Result of a catalog seed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Strains written.
    pub strains: usize,
    /// Locations written.
    pub locations: usize,
    /// Achievements written.
    pub achievements: usize,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// The operation surface of the simulation.
pub struct GameService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    weather: Arc<dyn WeatherProvider>,
    rng: Mutex<Box<dyn RandomSource>>,
    player_config: PlayerConfig,
}

impl<S> std::fmt::Debug for GameService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameService")
            .field("player_config", &self.player_config)
            .finish_non_exhaustive()
    }
}

impl<S: GameStore> GameService<S> {
    /// Wire a service to its collaborators.
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        weather: Arc<dyn WeatherProvider>,
        rng: Box<dyn RandomSource>,
        player_config: PlayerConfig,
    ) -> Self {
        Self {
            store,
            clock,
            weather,
            rng: Mutex::new(rng),
            player_config,
        }
    }

    /// The backing store.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The current time according to the service clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run `f` with the random source. A poisoned lock is recovered; the
    /// generator state is still usable.
    fn with_rng<T>(&self, f: impl FnOnce(&mut dyn RandomSource) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(rng.as_mut())
    }

    // -----------------------------------------------------------------------
    // Catalog
    // -----------------------------------------------------------------------

    /// Write reference data into tables that are still empty.
    ///
    /// Strains are validated as a set first; an invalid catalog writes
    /// nothing.
    pub fn seed_catalog(
        &self,
        strains: Vec<Strain>,
        locations: Vec<Location>,
        achievements: Vec<Achievement>,
    ) -> Result<SeedReport, GameError> {
        let catalog = StrainCatalog::from_strains(strains)?;
        let mut report = SeedReport::default();

        if self.store.strains()?.is_empty() {
            for strain in catalog.iter() {
                self.store.upsert_strain(strain.clone())?;
            }
            report.strains = catalog.len();
        }
        if self.store.locations()?.is_empty() {
            report.locations = locations.len();
            for site in locations {
                self.store.upsert_location(site)?;
            }
        }
        if self.store.achievements()?.is_empty() {
            report.achievements = achievements.len();
            for achievement in achievements {
                self.store.upsert_achievement(achievement)?;
            }
        }

        info!(
            strains = report.strains,
            locations = report.locations,
            achievements = report.achievements,
            "catalog seeded"
        );
        Ok(report)
    }

    /// Strains the player's level unlocks, cheapest tier first.
    pub fn available_strains(&self, player_id: PlayerId) -> Result<Vec<Strain>, GameError> {
        let player = self.store.player(player_id)?;
        let mut strains: Vec<Strain> = self
            .store
            .strains()?
            .into_iter()
            .filter(|s| s.unlock_level <= player.level)
            .collect();
        strains.sort_by(|a, b| {
            a.unlock_level
                .cmp(&b.unlock_level)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(strains)
    }

    /// Locations whose level and reputation gates the player meets, plus any
    /// the player has unlocked.
    pub fn available_locations(&self, player_id: PlayerId) -> Result<Vec<Location>, GameError> {
        let player = self.store.player(player_id)?;
        let mut locations: Vec<Location> = self
            .store
            .locations()?
            .into_iter()
            .filter(|l| location::is_accessible(l, &player))
            .collect();
        locations.sort_by(|a, b| {
            a.required_level
                .cmp(&b.required_level)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(locations)
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Return the user's player, provisioning one on first access.
    pub fn get_or_create_player(&self, user_id: UserId) -> Result<Player, GameError> {
        let now = self.clock.now();
        let config = &self.player_config;
        let player = self.store.get_or_insert_player(user_id, || {
            info!(user_id = %user_id, "provisioning new player");
            new_player(
                user_id,
                config.starting_tokens,
                config.starting_reputation,
                now,
            )
        })?;
        Ok(player)
    }

    /// Look up a player.
    pub fn player(&self, player_id: PlayerId) -> Result<Player, GameError> {
        Ok(self.store.player(player_id)?)
    }

    /// Look up the user's player without provisioning one.
    pub fn player_for_user(&self, user_id: UserId) -> Result<Player, GameError> {
        self.store
            .player_by_user(user_id)?
            .ok_or_else(|| GameError::not_found("player for user", user_id))
    }

    /// Credit tokens and record a `token_purchase` entry. Returns the new
    /// balance.
    pub fn add_tokens(
        &self,
        player_id: PlayerId,
        amount: u64,
        description: &str,
    ) -> Result<u64, GameError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount.into());
        }
        ensure_ledger_range(amount)?;
        let now = self.clock.now();

        let balance = self
            .store
            .update_player(player_id, |p| Ok::<_, GameError>(credit_tokens(p, amount, now)?))?;

        self.append_ledger(|ledger| {
            ledger
                .record_purchase(player_id, amount, description.to_owned(), now)
                .map(|_| ())
        });
        debug!(player_id = %player_id, amount, balance, "tokens added");
        Ok(balance)
    }

    /// Spend tokens on a purchase, recorded as `seed_purchase`. Fails with
    /// [`GameError::InsufficientFunds`] without changing anything if the
    /// balance is too small. Returns the new balance.
    pub fn spend_tokens(
        &self,
        player_id: PlayerId,
        amount: u64,
        strain_id: Option<StrainId>,
    ) -> Result<u64, GameError> {
        ensure_ledger_range(amount)?;
        let now = self.clock.now();
        let balance = self
            .store
            .update_player(player_id, |p| Ok::<_, GameError>(debit_tokens(p, amount, now)?))?;
        if amount > 0 {
            self.append_ledger(|ledger| {
                ledger
                    .record_seed_purchase(player_id, amount, strain_id, now)
                    .map(|_| ())
            });
        }
        debug!(player_id = %player_id, amount, balance, "tokens spent");
        Ok(balance)
    }

    /// Grant experience. A level-up pays its bonus, records a
    /// `level_up_bonus` entry and re-checks achievements.
    pub fn add_experience(
        &self,
        player_id: PlayerId,
        points: u64,
    ) -> Result<Option<LevelUp>, GameError> {
        let now = self.clock.now();
        let level_up = self
            .store
            .update_player(player_id, |p| Ok::<_, GameError>(apply_experience(p, points, now)?))?;
        debug!(player_id = %player_id, points, "experience added");
        if let Some(event) = level_up {
            self.record_level_up(player_id, event, now);
            if let Err(err) = self.check_achievements(player_id) {
                warn!(
                    player_id = %player_id,
                    error = %err,
                    "achievement check after level-up failed"
                );
            }
        }
        Ok(level_up)
    }

    // -----------------------------------------------------------------------
    // Plants
    // -----------------------------------------------------------------------

    /// Buy and plant a seed.
    ///
    /// The strain must exist and be unlocked, the location must be open to
    /// the player and have a free slot, and the player must afford the
    /// seed. The checks, the charge and the new plant happen under the
    /// player's row lock.
    pub fn plant_seed(
        &self,
        player_id: PlayerId,
        strain_id: StrainId,
        location_id: LocationId,
    ) -> Result<PlantId, GameError> {
        let strain = match self.store.strain(strain_id) {
            Ok(strain) => strain,
            Err(StoreError::Missing { .. }) => return Err(GameError::InvalidStrain(strain_id)),
            Err(err) => return Err(err.into()),
        };
        let site = self.store.location(location_id)?;
        ensure_ledger_range(strain.seed_price)?;
        let now = self.clock.now();

        let sown = self.store.update_player(player_id, |p| {
            if p.level < strain.unlock_level {
                return Err(GameError::StrainLocked {
                    strain: strain_id,
                    required: strain.unlock_level,
                    level: p.level,
                });
            }
            location::check_access(&site, p)
                .map_err(|denial| GameError::location_locked(location_id, denial))?;
            let plants = self.store.plants_for_player(p.id)?;
            if !location::has_capacity(&site, p, &plants) {
                return Err(GameError::LocationFull {
                    location: location_id,
                    max_plants: site.max_plants,
                });
            }
            debit_tokens(p, strain.seed_price, now)?;
            let sown = self.with_rng(|rng| plant::sow(p.id, &strain, location_id, now, rng))?;
            self.store.insert_plant(sown.clone())?;
            Ok(sown)
        })?;

        if strain.seed_price > 0 {
            self.append_ledger(|ledger| {
                ledger
                    .record_seed_purchase(player_id, strain.seed_price, Some(strain_id), now)
                    .map(|_| ())
            });
        }
        info!(
            player_id = %player_id,
            plant_id = %sown.id,
            strain = %strain.name,
            location = %site.name,
            harvest_ready_at = %sown.harvest_ready_at,
            "seed planted"
        );
        Ok(sown.id)
    }

    /// Look up a plant.
    pub fn plant(&self, plant_id: PlantId) -> Result<Plant, GameError> {
        Ok(self.store.plant(plant_id)?)
    }

    /// Every plant the player has sown.
    pub fn plants(&self, player_id: PlayerId) -> Result<Vec<Plant>, GameError> {
        Ok(self.store.plants_for_player(player_id)?)
    }

    /// Re-evaluate a plant's stage and health against the active weather.
    ///
    /// The stage is idempotent for a fixed time and weather. The weather's
    /// health delta is not: every call applies it again. The row is only
    /// written when the stage or health actually moved.
    pub fn evaluate_plant_stage(&self, plant_id: PlantId) -> Result<Plant, GameError> {
        let now = self.clock.now();
        let effects = self.weather.active_effects(now);
        let (plant, _) = self.evaluate_with(plant_id, &effects, now)?;
        Ok(plant)
    }

    fn evaluate_with(
        &self,
        plant_id: PlantId,
        effects: &[WeatherEffect],
        now: DateTime<Utc>,
    ) -> Result<(Plant, Evaluation), GameError> {
        let mut preview = self.store.plant(plant_id)?;
        let evaluation = plant::evaluate(&mut preview, effects, now);
        if !evaluation.is_dirty() {
            return Ok((preview, evaluation));
        }

        let (plant, evaluation) = self.store.update_plant(plant_id, |p| {
            let evaluation = plant::evaluate(p, effects, now);
            Ok::<_, GameError>((p.clone(), evaluation))
        })?;
        if evaluation.stage_changed() {
            debug!(
                plant_id = %plant_id,
                from = %evaluation.previous_stage,
                to = %evaluation.stage,
                ratio = evaluation.growth_ratio,
                "plant advanced"
            );
        }
        Ok((plant, evaluation))
    }

    /// Re-evaluate every plant still in the ground and roll for
    /// weather-driven disease. Returns how many changed stage. A plant that
    /// fails to evaluate is logged and skipped.
    pub fn tick_all_plants(&self) -> Result<usize, GameError> {
        let now = self.clock.now();
        let effects = self.weather.active_effects(now);
        let ids = self.store.growing_plant_ids()?;

        let mut advanced = 0_usize;
        let mut diseased = 0_usize;
        for id in &ids {
            match self.evaluate_with(*id, &effects, now) {
                Ok((_, evaluation)) if evaluation.stage_changed() => {
                    advanced = advanced.saturating_add(1);
                }
                Ok(_) => {}
                Err(err) => warn!(plant_id = %id, error = %err, "plant evaluation failed"),
            }
            match self.roll_disease(*id, &effects, now) {
                Ok(Some(_)) => diseased = diseased.saturating_add(1),
                Ok(None) => {}
                Err(err) => warn!(plant_id = %id, error = %err, "disease roll failed"),
            }
        }
        debug!(
            plants = ids.len(),
            advanced,
            diseased,
            weather = effects.len(),
            "plant tick complete"
        );
        Ok(advanced)
    }

    fn roll_disease(
        &self,
        plant_id: PlantId,
        effects: &[WeatherEffect],
        now: DateTime<Utc>,
    ) -> Result<Option<Ailment>, GameError> {
        if weather::disease_risk(effects) <= 0.0 {
            return Ok(None);
        }
        let (ailment, health) = self.store.update_plant(plant_id, |p| {
            let ailment = self.with_rng(|rng| plant::roll_disease(p, effects, now, rng));
            Ok::<_, GameError>((ailment, p.health))
        })?;
        if let Some(ailment) = ailment {
            info!(
                plant_id = %plant_id,
                ailment = ailment.as_str(),
                health,
                "plant fell ill"
            );
        }
        Ok(ailment)
    }

    /// Water a growing plant.
    pub fn water_plant(&self, plant_id: PlantId) -> Result<WaterOutcome, GameError> {
        let now = self.clock.now();
        let effects = self.weather.active_effects(now);
        let outcome = self
            .store
            .update_plant(plant_id, |p| Ok::<_, GameError>(plant::water(p, &effects, now)?))?;
        debug!(
            plant_id = %plant_id,
            boost = outcome.health_boost,
            health = outcome.new_health,
            "plant watered"
        );
        Ok(outcome)
    }

    /// Harvest a `harvest_ready` plant. The active weather scales the yield.
    pub fn harvest_plant(&self, plant_id: PlantId) -> Result<HarvestOutcome, GameError> {
        let strain_id = self.store.plant(plant_id)?.strain_id;
        let strain = self.store.strain(strain_id)?;
        let now = self.clock.now();
        let effects = self.weather.active_effects(now);

        let outcome = self.store.update_plant(plant_id, |p| {
            let outcome = self.with_rng(|rng| plant::harvest(p, &strain, &effects, now, rng))?;
            Ok::<_, GameError>(outcome)
        })?;
        info!(
            plant_id = %plant_id,
            weight = outcome.weight,
            thc = outcome.thc,
            quality = outcome.quality,
            "plant harvested"
        );
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Sales
    // -----------------------------------------------------------------------

    /// Sell a harvested plant at a location.
    ///
    /// Runs under the seller's row lock with the plant's row lock nested
    /// inside it. The quote, the credit of tokens, experience and
    /// reputation, the move to `sold` and the sale row either all happen or
    /// none do, so a second sale of the same plant fails with
    /// [`GameError::InvalidState`] and a credit that would overflow leaves
    /// the plant `harvested`. The ledger then gets a `plant_sale` entry and
    /// achievements are re-checked.
    ///
    /// A harvest worth less than one token still produces a sale row but no
    /// ledger entry, since ledger amounts are never zero.
    pub fn sell_plant(
        &self,
        player_id: PlayerId,
        plant_id: PlantId,
        location_id: LocationId,
    ) -> Result<SaleOutcome, GameError> {
        let site = self.store.location(location_id)?;
        let strain_id = self.store.plant(plant_id)?.strain_id;
        let price_modifier = self.price_modifier(location_id, strain_id);
        let now = self.clock.now();

        let (sale, tokens, level_up) = self.store.update_player(player_id, |seller| {
            location::check_access(&site, seller)
                .map_err(|denial| GameError::location_locked(location_id, denial))?;
            self.store.update_plant(plant_id, |p| {
                if p.player_id != player_id {
                    return Err(GameError::invalid_state("plant belongs to another player"));
                }
                let sale_quote = self.with_rng(|rng| quote(p, &site, price_modifier, rng))?;
                ensure_ledger_range(sale_quote.tokens)?;
                credit_tokens(seller, sale_quote.tokens, now)?;
                adjust_reputation(seller, sale_quote.reputation, now);
                let level_up = apply_experience(seller, sale_quote.experience, now)?;
                plant::mark_sold(p, now)?;
                let sale = to_sale(&sale_quote, player_id, p, &site, now);
                self.store.insert_sale(sale.clone())?;
                Ok((sale, sale_quote.tokens, level_up))
            })
        })?;

        if tokens > 0 {
            self.append_ledger(|ledger| {
                ledger
                    .record_sale(player_id, tokens, sale.id, now)
                    .map(|_| ())
            });
        }
        if let Some(event) = level_up {
            self.record_level_up(player_id, event, now);
        }

        info!(
            player_id = %player_id,
            plant_id = %plant_id,
            sale_id = %sale.id,
            location = %site.name,
            final_price = sale.final_price,
            tokens,
            experience = sale.experience_gained,
            reputation = sale.reputation_gained,
            "plant sold"
        );

        let achievements = self.check_achievements(player_id).unwrap_or_else(|err| {
            warn!(player_id = %player_id, error = %err, "achievement check after sale failed");
            Vec::new()
        });

        Ok(SaleOutcome {
            sale,
            tokens,
            level_up,
            achievements,
        })
    }

    /// Every sale the player has made, oldest first.
    pub fn sales(&self, player_id: PlayerId) -> Result<Vec<Sale>, GameError> {
        Ok(self.store.sales_for_player(player_id)?)
    }

    // -----------------------------------------------------------------------
    // Achievements
    // -----------------------------------------------------------------------

    /// Grant every achievement the player now qualifies for.
    ///
    /// Rewards can push the player over further thresholds (a reward's
    /// experience may reach a level milestone), so evaluation repeats until
    /// nothing new is earned. Safe to call redundantly.
    pub fn check_achievements(&self, player_id: PlayerId) -> Result<Vec<Achievement>, GameError> {
        let definitions = self.store.achievements()?;
        let mut earned_now = Vec::new();

        loop {
            let player = self.store.player(player_id)?;
            let earned = self.store.earned_achievements(player_id)?;
            let sales = self.store.sale_count(player_id)?;
            let plants = self.store.plants_for_player(player_id)?;
            let progress = self
                .store
                .with_ledger(|ledger| AchievementProgress::gather(&player, sales, &plants, ledger))?;

            let candidates: Vec<Achievement> = newly_met(&definitions, &earned, &progress)
                .into_iter()
                .cloned()
                .collect();

            let mut granted_any = false;
            for achievement in candidates {
                if self.grant_achievement(player_id, &achievement)? {
                    granted_any = true;
                    earned_now.push(achievement);
                }
            }
            if !granted_any {
                break;
            }
        }
        Ok(earned_now)
    }

    /// Record one achievement, pay its reward and open any location it
    /// unlocks. Returns `false` if it had already been recorded.
    fn grant_achievement(
        &self,
        player_id: PlayerId,
        achievement: &Achievement,
    ) -> Result<bool, GameError> {
        ensure_ledger_range(achievement.reward_tokens)?;
        let now = self.clock.now();
        let inserted = self.store.insert_player_achievement(PlayerAchievement {
            player_id,
            achievement_id: achievement.id,
            earned_at: now,
        })?;
        if !inserted {
            return Ok(false);
        }

        let level_up = self.store.update_player(player_id, |p| {
            credit_tokens(p, achievement.reward_tokens, now)?;
            if let Some(location_id) = achievement.unlock_location_id {
                unlock_location(p, location_id, now);
            }
            Ok::<_, GameError>(apply_experience(p, achievement.reward_experience, now)?)
        })?;

        if achievement.reward_tokens > 0 {
            self.append_ledger(|ledger| {
                ledger
                    .record_achievement_reward(
                        player_id,
                        achievement.reward_tokens,
                        achievement.id,
                        &achievement.name,
                        now,
                    )
                    .map(|_| ())
            });
        }
        if let Some(event) = level_up {
            self.record_level_up(player_id, event, now);
        }

        info!(
            player_id = %player_id,
            achievement = %achievement.name,
            reward_tokens = achievement.reward_tokens,
            reward_experience = achievement.reward_experience,
            "achievement earned"
        );
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Market
    // -----------------------------------------------------------------------

    /// Redraw supply, demand and price for every (location, strain) pair,
    /// append each draw to the price history, and drop history older than
    /// [`PRICE_HISTORY_RETENTION_DAYS`]. Returns the number of rows written.
    pub fn run_market_sweep(&self) -> Result<usize, GameError> {
        let now = self.clock.now();
        let locations = self.store.locations()?;
        let strains = self.store.strains()?;

        let mut written = 0_usize;
        for site in &locations {
            for strain in &strains {
                let condition =
                    self.with_rng(|rng| market::draw_condition(site.id, strain.id, now, rng));
                self.store.record_price_point(PricePoint::from(&condition))?;
                self.store.upsert_market(condition)?;
                written = written.saturating_add(1);
            }
        }
        let cutoff = price_history_floor(now);
        let pruned = self.store.prune_price_history(cutoff)?;
        info!(
            locations = locations.len(),
            strains = strains.len(),
            rows = written,
            history_pruned = pruned,
            "market sweep complete"
        );
        Ok(written)
    }

    /// Price history for a strain over the last `days` days, oldest first.
    /// `None` covers every location.
    pub fn price_history(
        &self,
        strain_id: StrainId,
        location_id: Option<LocationId>,
        days: u32,
    ) -> Result<Vec<PricePoint>, GameError> {
        self.store.strain(strain_id)?;
        let since = days_before(self.clock.now(), i64::from(days));
        Ok(self.store.price_history(strain_id, location_id, since)?)
    }

    /// The stored price modifier for a pair, or 1.0 if none is available.
    pub fn price_modifier(&self, location_id: LocationId, strain_id: StrainId) -> f64 {
        match self.store.market_condition(location_id, strain_id) {
            Ok(Some(condition)) => condition.price_modifier,
            Ok(None) => DEFAULT_PRICE_MODIFIER,
            Err(err) => {
                warn!(
                    location_id = %location_id,
                    strain_id = %strain_id,
                    error = %err,
                    "market row unavailable, using default price"
                );
                DEFAULT_PRICE_MODIFIER
            }
        }
    }

    /// Current market rows at a location.
    pub fn market_prices(&self, location_id: LocationId) -> Result<Vec<MarketCondition>, GameError> {
        self.store.location(location_id)?;
        Ok(self.store.market_for_location(location_id)?)
    }

    // -----------------------------------------------------------------------
    // Weather
    // -----------------------------------------------------------------------

    /// Effects active right now.
    pub fn active_weather(&self) -> Vec<WeatherEffect> {
        self.weather.active_effects(self.clock.now())
    }

    /// Prune expired effects on `board` and roll new ones. Returns the
    /// effects that were started.
    pub fn run_weather_cycle(&self, board: &WeatherBoard) -> Vec<WeatherEffect> {
        let now = self.clock.now();
        self.with_rng(|rng| WeatherSystem.run_cycle(board, now, rng))
    }

    /// Effects on `board` due to start within the next `hours` hours.
    pub fn weather_forecast(&self, board: &WeatherBoard, hours: u32) -> Vec<WeatherEffect> {
        let horizon = Duration::try_hours(i64::from(hours)).unwrap_or_else(Duration::zero);
        board.forecast(self.clock.now(), horizon)
    }

    /// End a running effect on `board` now. Returns `false` if it was not
    /// running.
    pub fn end_weather_effect(&self, board: &WeatherBoard, id: WeatherEffectId) -> bool {
        board.end_early(id, self.clock.now())
    }

    // -----------------------------------------------------------------------
    // Ledger
    // -----------------------------------------------------------------------

    /// A player's ledger entries, oldest first.
    pub fn transactions(&self, player_id: PlayerId) -> Result<Vec<GameTransaction>, GameError> {
        Ok(self.store.with_ledger(|ledger| {
            ledger
                .entries_for_player(player_id)
                .into_iter()
                .cloned()
                .collect()
        })?)
    }

    /// Audit every live balance against the ledger, assuming each player
    /// opened with the configured starting balance.
    pub fn reconcile(&self) -> Result<ReconcileResult, GameError> {
        let balances: BTreeMap<PlayerId, u64> = self
            .store
            .players()?
            .into_iter()
            .map(|p| (p.id, p.tokens))
            .collect();
        let opening = self.player_config.starting_tokens;
        let result = self
            .store
            .with_ledger(|ledger| reconcile_balances(ledger.all_entries(), opening, &balances))?;

        match &result {
            ReconcileResult::Balanced => {
                debug!(players = balances.len(), "ledger reconciled");
            }
            ReconcileResult::Anomaly(anomaly) => {
                error!(
                    mismatches = anomaly.mismatches.len(),
                    "{}", anomaly.message
                );
            }
        }
        Ok(result)
    }

    /// Append to the ledger after a balance change. Failures are logged and
    /// the balance change stands.
    fn append_ledger(&self, f: impl FnOnce(&mut canopy_ledger::Ledger) -> Result<(), LedgerError>) {
        match self.store.with_ledger(f) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(error = %err, "ledger entry rejected after balance change"),
            Err(err) => error!(error = %err, "ledger unavailable after balance change"),
        }
    }

    fn record_level_up(&self, player_id: PlayerId, event: LevelUp, now: DateTime<Utc>) {
        if event.token_reward == 0 {
            return;
        }
        self.append_ledger(|ledger| {
            ledger
                .record_level_up_bonus(player_id, event.token_reward, event.new_level, now)
                .map(|_| ())
        });
    }
}

/// Oldest instant still inside the price-history retention window.
pub fn price_history_floor(now: DateTime<Utc>) -> DateTime<Utc> {
    days_before(now, PRICE_HISTORY_RETENTION_DAYS)
}

/// `now` minus a number of days, saturating at `now`.
fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days)
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(now)
}

/// Reject token amounts the signed ledger cannot hold, before any row is
/// touched.
fn ensure_ledger_range(tokens: u64) -> Result<(), GameError> {
    i64::try_from(tokens)
        .map(|_| ())
        .map_err(|_overflow| LedgerError::AmountOutOfRange(tokens).into())
}
