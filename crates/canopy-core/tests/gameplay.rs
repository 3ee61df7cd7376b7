//! Service-level gameplay tests against the in-memory store.
//!
//! Time is driven by a [`ManualClock`], weather by a [`WeatherBoard`] the
//! test fills by hand, and randomness by [`FixedRandom`] unless a test
//! needs spread.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use canopy_core::{GameError, GameService, GameStore, ManualClock, MemoryStore};
use canopy_core::config::PlayerConfig;
use canopy_ledger::ReconcileResult;
use canopy_types::{
    Achievement, AchievementId, AchievementKind, Location, LocationId, PlayerId, Rarity,
    Severity, Stage, Strain, StrainId, StrainType, TransactionType, UserId, WeatherEffect,
    WeatherKind,
};
use canopy_world::{
    FixedRandom, RandomSource, SeededRandom, WeatherBoard, starter_achievements,
    starter_locations, starter_strains,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct World {
    service: Arc<GameService<MemoryStore>>,
    clock: Arc<ManualClock>,
    board: Arc<WeatherBoard>,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn world_with(rng: Box<dyn RandomSource>) -> World {
    let clock = Arc::new(ManualClock::new(start()));
    let board = Arc::new(WeatherBoard::new());
    let service = GameService::new(
        Arc::new(MemoryStore::new()),
        clock.clone(),
        board.clone(),
        rng,
        PlayerConfig::default(),
    );
    World {
        service: Arc::new(service),
        clock,
        board,
    }
}

fn world() -> World {
    world_with(Box::new(FixedRandom::midpoint()))
}

fn strain(name: &str, days: u32, seed_price: u64, unlock_level: u32) -> Strain {
    Strain {
        id: StrainId::new(),
        name: name.to_owned(),
        strain_type: StrainType::Hybrid,
        thc_min: 18.0,
        thc_max: 22.0,
        yield_min: 40.0,
        yield_max: 60.0,
        flowering_time_min: days,
        flowering_time_max: days,
        unlock_level,
        seed_price,
        rarity: Rarity::Common,
    }
}

fn location(name: &str, required_reputation: i64, max_plants: u32) -> Location {
    Location {
        id: LocationId::new(),
        name: name.to_owned(),
        market_modifier: 1.0,
        required_level: 1,
        required_reputation,
        max_plants,
    }
}

fn achievement(
    name: &str,
    kind: AchievementKind,
    requirement_value: u64,
    reward_tokens: u64,
    reward_experience: u64,
) -> Achievement {
    Achievement {
        id: AchievementId::new(),
        name: name.to_owned(),
        description: name.to_owned(),
        kind,
        requirement_value,
        reward_tokens,
        reward_experience,
        unlock_location_id: None,
    }
}

/// A world with one five-day strain and one open location.
fn garden(achievements: Vec<Achievement>) -> (World, Strain, Location) {
    let w = world();
    let kush = strain("Five Day Kush", 5, 20, 1);
    let yard = location("Yard", 0, 4);
    w.service
        .seed_catalog(vec![kush.clone()], vec![yard.clone()], achievements)
        .unwrap();
    (w, kush, yard)
}

fn new_player(w: &World) -> PlayerId {
    w.service.get_or_create_player(UserId::new()).unwrap().id
}

/// Plant, wait out the growing window, and harvest.
fn grow_and_harvest(w: &World, player: PlayerId, kush: &Strain, yard: &Location) -> canopy_types::PlantId {
    let plant_id = w.service.plant_seed(player, kush.id, yard.id).unwrap();
    w.clock.advance(Duration::days(i64::from(kush.flowering_time_max)));
    assert_eq!(
        w.service.evaluate_plant_stage(plant_id).unwrap().stage,
        Stage::HarvestReady
    );
    w.service.harvest_plant(plant_id).unwrap();
    plant_id
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_tokens(price: f64) -> u64 {
    price.floor() as u64
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn plant_grow_harvest_sell() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);

    let plant_id = w.service.plant_seed(player, kush.id, yard.id).unwrap();
    assert_eq!(w.service.player(player).unwrap().tokens, 80);
    assert_eq!(w.service.plant(plant_id).unwrap().stage, Stage::Germination);

    w.clock.advance(Duration::days(5));
    let plant = w.service.evaluate_plant_stage(plant_id).unwrap();
    assert_eq!(plant.stage, Stage::HarvestReady);

    let harvest = w.service.harvest_plant(plant_id).unwrap();
    assert!(harvest.weight > 0.0);
    assert!((18.0..=22.0).contains(&harvest.thc));

    let before = w.service.player(player).unwrap().tokens;
    let outcome = w.service.sell_plant(player, plant_id, yard.id).unwrap();
    let sale = &outcome.sale;

    let expected = 15.0 * harvest.weight * harvest.quality;
    assert!((sale.final_price - expected).abs() < 1e-9);
    assert!((sale.base_price - 15.0 * harvest.weight).abs() < 1e-9);
    assert_eq!(outcome.tokens, floor_tokens(sale.final_price));

    let after = w.service.player(player).unwrap();
    assert_eq!(after.tokens, before + floor_tokens(sale.final_price));
    assert_eq!(after.experience, floor_tokens(sale.final_price * 0.1));
    assert_eq!(after.reputation, 100 + sale.reputation_gained);
    assert!((1..=5).contains(&sale.reputation_gained));
    assert_eq!(w.service.plant(plant_id).unwrap().stage, Stage::Sold);
}

// ---------------------------------------------------------------------------
// Plant lifecycle
// ---------------------------------------------------------------------------

#[test]
fn stage_never_regresses_as_time_advances() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    let plant_id = w.service.plant_seed(player, kush.id, yard.id).unwrap();

    let cold_from = start() + Duration::days(3);
    w.board.add(WeatherEffect::new(
        WeatherKind::ColdSnap,
        Severity::Severe,
        cold_from,
        cold_from + Duration::days(3),
    ));

    let mut stages = Vec::new();
    for _ in 0..14 {
        w.clock.advance(Duration::hours(12));
        stages.push(w.service.evaluate_plant_stage(plant_id).unwrap().stage);
    }

    for pair in stages.windows(2) {
        if let [earlier, later] = pair {
            assert!(later >= earlier, "{earlier} -> {later}");
        }
    }
    assert_eq!(stages.last(), Some(&Stage::HarvestReady));
}

#[test]
fn cold_snap_delays_harvest() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    let plant_id = w.service.plant_seed(player, kush.id, yard.id).unwrap();

    let now = start() + Duration::days(5);
    w.board.add(WeatherEffect::new(
        WeatherKind::ColdSnap,
        Severity::Moderate,
        now,
        now + Duration::hours(6),
    ));
    w.clock.set(now);

    let plant = w.service.evaluate_plant_stage(plant_id).unwrap();
    assert_eq!(plant.stage, Stage::Vegetative);
    assert!(plant.health < 1.0);
    assert!(matches!(
        w.service.harvest_plant(plant_id),
        Err(GameError::InvalidState { .. })
    ));

    w.clock.advance(Duration::hours(6));
    assert_eq!(
        w.service.evaluate_plant_stage(plant_id).unwrap().stage,
        Stage::HarvestReady
    );
}

#[test]
fn repeated_evaluation_is_idempotent() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    let plant_id = w.service.plant_seed(player, kush.id, yard.id).unwrap();
    w.clock.advance(Duration::days(2));

    let first = w.service.evaluate_plant_stage(plant_id).unwrap();
    w.service.store().drain_changes().unwrap();
    let second = w.service.evaluate_plant_stage(plant_id).unwrap();

    assert_eq!(first, second);
    assert!(w.service.store().drain_changes().unwrap().plants.is_empty());
}

#[test]
fn watering_never_exceeds_full_health() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    let plant_id = w.service.plant_seed(player, kush.id, yard.id).unwrap();

    w.board.add(WeatherEffect::new(
        WeatherKind::Drought,
        Severity::Extreme,
        start(),
        start() + Duration::days(1),
    ));
    w.clock.advance(Duration::hours(1));
    let parched = w.service.evaluate_plant_stage(plant_id).unwrap();
    assert!(parched.health < 1.0);

    let first = w.service.water_plant(plant_id).unwrap();
    assert!((first.health_boost - 0.075).abs() < 1e-9);

    for _ in 0..50 {
        let outcome = w.service.water_plant(plant_id).unwrap();
        assert!(outcome.new_health <= 1.0);
    }
    assert!((w.service.plant(plant_id).unwrap().health - 1.0).abs() < f64::EPSILON);
}

#[test]
fn harvest_before_ready_fails_and_leaves_plant_unchanged() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    let plant_id = w.service.plant_seed(player, kush.id, yard.id).unwrap();
    w.clock.advance(Duration::days(3));
    let before = w.service.evaluate_plant_stage(plant_id).unwrap();

    assert!(matches!(
        w.service.harvest_plant(plant_id),
        Err(GameError::InvalidState { .. })
    ));
    assert_eq!(w.service.plant(plant_id).unwrap(), before);
}

#[test]
fn reharvest_fails() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    let plant_id = grow_and_harvest(&w, player, &kush, &yard);
    let harvested = w.service.plant(plant_id).unwrap();

    assert!(matches!(
        w.service.harvest_plant(plant_id),
        Err(GameError::InvalidState { .. })
    ));
    assert!(matches!(
        w.service.water_plant(plant_id),
        Err(GameError::InvalidState { .. })
    ));
    assert_eq!(w.service.plant(plant_id).unwrap(), harvested);
}

#[test]
fn sunny_weather_at_harvest_raises_the_yield() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    let plant_id = w.service.plant_seed(player, kush.id, yard.id).unwrap();
    w.clock.advance(Duration::days(5));
    w.service.evaluate_plant_stage(plant_id).unwrap();

    let now = w.service.now();
    w.board.add(WeatherEffect::new(
        WeatherKind::Sunny,
        Severity::Moderate,
        now - Duration::hours(1),
        now + Duration::hours(1),
    ));
    let harvest = w.service.harvest_plant(plant_id).unwrap();
    // 50g at full health and an even quality draw, +10% for the sun.
    assert!((harvest.weight - 55.0).abs() < 1e-9);
}

#[test]
fn plant_tick_rolls_for_disease_in_bad_weather() {
    let w = world_with(Box::new(FixedRandom::new(0.1)));
    let kush = strain("Five Day Kush", 5, 20, 1);
    let yard = location("Yard", 0, 4);
    w.service
        .seed_catalog(vec![kush.clone()], vec![yard.clone()], Vec::new())
        .unwrap();
    let player = new_player(&w);
    let plant_id = w.service.plant_seed(player, kush.id, yard.id).unwrap();

    w.board.add(WeatherEffect::new(
        WeatherKind::Drought,
        Severity::Extreme,
        start(),
        start() + Duration::days(1),
    ));
    w.clock.advance(Duration::hours(1));
    w.service.tick_all_plants().unwrap();

    // -0.08 from the drought itself, -0.15 from the illness.
    let health = w.service.plant(plant_id).unwrap().health;
    assert!((health - 0.77).abs() < 1e-9);
}

#[test]
fn clear_skies_never_make_plants_ill() {
    let w = world_with(Box::new(FixedRandom::new(0.0)));
    let kush = strain("Five Day Kush", 5, 0, 1);
    let yard = location("Yard", 0, 4);
    w.service
        .seed_catalog(vec![kush.clone()], vec![yard.clone()], Vec::new())
        .unwrap();
    let player = new_player(&w);
    let plant_id = w.service.plant_seed(player, kush.id, yard.id).unwrap();

    for _ in 0..10 {
        w.clock.advance(Duration::hours(1));
        w.service.tick_all_plants().unwrap();
    }
    assert!((w.service.plant(plant_id).unwrap().health - 1.0).abs() < f64::EPSILON);
}

#[test]
fn plant_tick_counts_stage_changes() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    let a = w.service.plant_seed(player, kush.id, yard.id).unwrap();
    let b = w.service.plant_seed(player, kush.id, yard.id).unwrap();

    w.clock.advance(Duration::days(1));
    assert_eq!(w.service.tick_all_plants().unwrap(), 2);
    assert_eq!(w.service.tick_all_plants().unwrap(), 0);

    w.clock.advance(Duration::days(4));
    assert_eq!(w.service.tick_all_plants().unwrap(), 2);
    assert_eq!(w.service.plant(a).unwrap().stage, Stage::HarvestReady);
    assert_eq!(w.service.plant(b).unwrap().stage, Stage::HarvestReady);
}

// ---------------------------------------------------------------------------
// Planting rules
// ---------------------------------------------------------------------------

#[test]
fn unknown_strain_is_invalid_strain() {
    let (w, _, yard) = garden(Vec::new());
    let player = new_player(&w);
    let ghost = StrainId::new();
    match w.service.plant_seed(player, ghost, yard.id) {
        Err(GameError::InvalidStrain(id)) => assert_eq!(id, ghost),
        other => panic!("expected InvalidStrain, got {other:?}"),
    }
}

#[test]
fn missing_location_and_plant_are_not_found() {
    let (w, kush, _) = garden(Vec::new());
    let player = new_player(&w);
    assert!(matches!(
        w.service.plant_seed(player, kush.id, LocationId::new()),
        Err(GameError::NotFound { kind: "location", .. })
    ));
    assert!(matches!(
        w.service.harvest_plant(canopy_types::PlantId::new()),
        Err(GameError::NotFound { kind: "plant", .. })
    ));
}

#[test]
fn insufficient_funds_changes_nothing() {
    let w = world();
    let pricey = strain("Pricey", 5, 500, 1);
    let yard = location("Yard", 0, 4);
    w.service
        .seed_catalog(vec![pricey.clone()], vec![yard.clone()], Vec::new())
        .unwrap();
    let player = new_player(&w);

    match w.service.plant_seed(player, pricey.id, yard.id) {
        Err(GameError::InsufficientFunds {
            required,
            available,
        }) => {
            assert_eq!(required, 500);
            assert_eq!(available, 100);
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }
    assert_eq!(w.service.player(player).unwrap().tokens, 100);
    assert!(w.service.plants(player).unwrap().is_empty());
    assert!(w.service.transactions(player).unwrap().is_empty());
}

#[test]
fn seed_purchase_is_a_negative_ledger_entry() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    w.service.plant_seed(player, kush.id, yard.id).unwrap();

    let entries = w.service.transactions(player).unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.transaction_type, TransactionType::SeedPurchase);
    assert_eq!(entry.amount, -20);
    assert_eq!(entry.reference_id, Some(kush.id.into_inner()));
}

#[test]
fn locked_strain_and_location_are_refused() {
    let w = world();
    let advanced = strain("Advanced", 5, 10, 3);
    let basic = strain("Basic", 5, 10, 1);
    let yard = location("Yard", 0, 4);
    let greenhouse = location("Greenhouse", 150, 4);
    w.service
        .seed_catalog(
            vec![advanced.clone(), basic.clone()],
            vec![yard.clone(), greenhouse.clone()],
            Vec::new(),
        )
        .unwrap();
    let player = new_player(&w);

    assert!(matches!(
        w.service.plant_seed(player, advanced.id, yard.id),
        Err(GameError::StrainLocked { required: 3, level: 1, .. })
    ));
    assert!(matches!(
        w.service.plant_seed(player, basic.id, greenhouse.id),
        Err(GameError::LocationLocked { .. })
    ));
    assert_eq!(w.service.player(player).unwrap().tokens, 100);

    let strains: Vec<_> = w
        .service
        .available_strains(player)
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(strains, vec![basic.id]);
    let locations: Vec<_> = w
        .service
        .available_locations(player)
        .unwrap()
        .into_iter()
        .map(|l| l.id)
        .collect();
    assert_eq!(locations, vec![yard.id]);
}

// ---------------------------------------------------------------------------
// Sales
// ---------------------------------------------------------------------------

#[test]
fn second_sale_of_the_same_plant_fails() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    let plant_id = grow_and_harvest(&w, player, &kush, &yard);

    let first = w.service.sell_plant(player, plant_id, yard.id).unwrap();
    let balance = w.service.player(player).unwrap().tokens;

    assert!(matches!(
        w.service.sell_plant(player, plant_id, yard.id),
        Err(GameError::InvalidState { .. })
    ));
    assert_eq!(w.service.player(player).unwrap().tokens, balance);

    let sales = w.service.sales(player).unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].id, first.sale.id);

    let credits = w
        .service
        .transactions(player)
        .unwrap()
        .into_iter()
        .filter(|t| t.transaction_type == TransactionType::PlantSale)
        .count();
    assert_eq!(credits, 1);
}

#[test]
fn unharvested_plant_cannot_be_sold() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    let plant_id = w.service.plant_seed(player, kush.id, yard.id).unwrap();

    assert!(matches!(
        w.service.sell_plant(player, plant_id, yard.id),
        Err(GameError::InvalidState { .. })
    ));
    assert!(matches!(
        w.service.sell_plant(player, plant_id, LocationId::new()),
        Err(GameError::NotFound { kind: "location", .. })
    ));
    assert!(w.service.sales(player).unwrap().is_empty());
}

#[test]
fn sale_price_follows_the_market_row() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    assert!((w.service.price_modifier(yard.id, kush.id) - 1.0).abs() < f64::EPSILON);

    w.service.run_market_sweep().unwrap();
    let modifier = w.service.price_modifier(yard.id, kush.id);
    let rows = w.service.market_prices(yard.id).unwrap();
    assert_eq!(rows.len(), 1);
    assert!((rows[0].price_modifier - modifier).abs() < f64::EPSILON);

    let plant_id = grow_and_harvest(&w, player, &kush, &yard);
    let plant = w.service.plant(plant_id).unwrap();
    let outcome = w.service.sell_plant(player, plant_id, yard.id).unwrap();

    let weight = plant.final_weight.unwrap();
    let quality = plant.final_quality.unwrap();
    let expected = 15.0 * weight * modifier * quality;
    assert!((outcome.sale.final_price - expected).abs() < 1e-9);
}

#[test]
fn failed_credit_leaves_the_plant_unsold() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    let plant_id = grow_and_harvest(&w, player, &kush, &yard);

    // Push the balance to within a few hundred tokens of u64::MAX.
    let max_grant = u64::try_from(i64::MAX).unwrap();
    w.service.add_tokens(player, max_grant, "whale").unwrap();
    w.service.add_tokens(player, max_grant - 200, "whale").unwrap();
    let before = w.service.player(player).unwrap();

    for _ in 0..2 {
        assert!(matches!(
            w.service.sell_plant(player, plant_id, yard.id),
            Err(GameError::Progression(_))
        ));
        assert_eq!(w.service.plant(plant_id).unwrap().stage, Stage::Harvested);
        assert!(w.service.sales(player).unwrap().is_empty());
        assert_eq!(w.service.player(player).unwrap(), before);
    }

    w.service.spend_tokens(player, max_grant, None).unwrap();
    assert!(w.service.sell_plant(player, plant_id, yard.id).is_ok());
    assert_eq!(w.service.plant(plant_id).unwrap().stage, Stage::Sold);
}

#[test]
fn dead_plant_sells_for_nothing_without_a_ledger_entry() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    let plant_id = w.service.plant_seed(player, kush.id, yard.id).unwrap();

    w.board.add(WeatherEffect::new(
        WeatherKind::Drought,
        Severity::Extreme,
        start(),
        start() + Duration::hours(2),
    ));
    for _ in 0..15 {
        w.clock.advance(Duration::minutes(5));
        w.service.evaluate_plant_stage(plant_id).unwrap();
    }
    assert!(w.service.plant(plant_id).unwrap().health.abs() < f64::EPSILON);

    w.clock.set(start() + Duration::days(5));
    assert_eq!(
        w.service.evaluate_plant_stage(plant_id).unwrap().stage,
        Stage::HarvestReady
    );
    let harvest = w.service.harvest_plant(plant_id).unwrap();
    assert!(harvest.weight.abs() < f64::EPSILON);
    assert!(harvest.quality.abs() < f64::EPSILON);

    let before = w.service.player(player).unwrap();
    let outcome = w.service.sell_plant(player, plant_id, yard.id).unwrap();
    assert_eq!(outcome.tokens, 0);
    assert_eq!(outcome.sale.experience_gained, 0);
    assert_eq!(w.service.sales(player).unwrap().len(), 1);
    assert_eq!(w.service.plant(plant_id).unwrap().stage, Stage::Sold);

    let after = w.service.player(player).unwrap();
    assert_eq!(after.tokens, before.tokens);
    assert_eq!(after.reputation, before.reputation + outcome.sale.reputation_gained);
    assert!(
        !w.service
            .transactions(player)
            .unwrap()
            .iter()
            .any(|t| t.transaction_type == TransactionType::PlantSale)
    );
    assert!(w.service.reconcile().unwrap().is_balanced());
}

#[test]
fn sale_is_queued_for_persistence() {
    let (w, kush, yard) = garden(Vec::new());
    let player = new_player(&w);
    let plant_id = grow_and_harvest(&w, player, &kush, &yard);
    w.service.store().drain_changes().unwrap();

    let outcome = w.service.sell_plant(player, plant_id, yard.id).unwrap();
    let changes = w.service.store().drain_changes().unwrap();

    assert_eq!(changes.sales.len(), 1);
    assert_eq!(changes.sales[0].id, outcome.sale.id);
    assert_eq!(
        changes.plants.get(&plant_id).map(|p| p.stage),
        Some(Stage::Sold)
    );
    assert!(changes.players.contains_key(&player));
    assert!(
        changes
            .transactions
            .iter()
            .any(|t| t.transaction_type == TransactionType::PlantSale)
    );
}

// ---------------------------------------------------------------------------
// Progression
// ---------------------------------------------------------------------------

#[test]
fn thousand_experience_levels_up_once() {
    let w = world();
    let player = new_player(&w);

    let level_up = w.service.add_experience(player, 1000).unwrap().unwrap();
    assert_eq!(level_up.old_level, 1);
    assert_eq!(level_up.new_level, 2);
    assert_eq!(level_up.token_reward, 50);

    assert!(w.service.add_experience(player, 0).unwrap().is_none());
    assert!(w.service.add_experience(player, 999).unwrap().is_none());

    let after = w.service.player(player).unwrap();
    assert_eq!(after.level, 2);
    assert_eq!(after.tokens, 150);

    let bonuses = w
        .service
        .transactions(player)
        .unwrap()
        .into_iter()
        .filter(|t| t.transaction_type == TransactionType::LevelUpBonus)
        .count();
    assert_eq!(bonuses, 1);
}

#[test]
fn level_up_grants_level_milestones_immediately() {
    let w = world();
    let level_two = achievement("Level Two", AchievementKind::LevelMilestone, 2, 25, 0);
    w.service
        .seed_catalog(Vec::new(), Vec::new(), vec![level_two.clone()])
        .unwrap();
    let player = new_player(&w);

    w.service.add_experience(player, 1000).unwrap();

    let earned = w.service.store().earned_achievements(player).unwrap();
    assert!(earned.contains(&level_two.id));
    assert_eq!(w.service.player(player).unwrap().tokens, 100 + 50 + 25);
    assert!(w.service.check_achievements(player).unwrap().is_empty());
}

#[test]
fn ledger_outage_keeps_the_balance_change() {
    let w = world();
    let player = new_player(&w);

    let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        w.service
            .store()
            .with_ledger::<()>(|_| panic!("writer died holding the ledger"))
    }));
    assert!(poisoned.is_err());

    assert_eq!(w.service.add_tokens(player, 25, "gift").unwrap(), 125);
    assert_eq!(w.service.player(player).unwrap().tokens, 125);
    assert!(matches!(
        w.service.transactions(player),
        Err(GameError::Store(_))
    ));
}

#[test]
fn player_lookup_by_user_does_not_provision() {
    let w = world();
    let user = UserId::new();
    assert!(matches!(
        w.service.player_for_user(user),
        Err(GameError::NotFound { .. })
    ));
    let created = w.service.get_or_create_player(user).unwrap();
    assert_eq!(w.service.player_for_user(user).unwrap().id, created.id);
}

#[test]
fn spend_beyond_balance_fails_without_mutation() {
    let w = world();
    let player = new_player(&w);
    assert!(matches!(
        w.service.spend_tokens(player, 101, None),
        Err(GameError::InsufficientFunds {
            required: 101,
            available: 100
        })
    ));
    assert_eq!(w.service.player(player).unwrap().tokens, 100);
    assert_eq!(w.service.spend_tokens(player, 100, None).unwrap(), 0);
}

#[test]
fn player_is_provisioned_once_per_user() {
    let w = world();
    let user = UserId::new();
    let first = w.service.get_or_create_player(user).unwrap();
    assert_eq!(first.tokens, 100);
    assert_eq!(first.reputation, 100);
    assert_eq!(first.level, 1);

    w.service.add_tokens(first.id, 5, "gift").unwrap();
    let again = w.service.get_or_create_player(user).unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(again.tokens, 105);
}

#[test]
fn concurrent_credits_are_not_lost() {
    let w = world();
    let player = new_player(&w);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let service = Arc::clone(&w.service);
            scope.spawn(move || {
                for _ in 0..25 {
                    service.add_tokens(player, 1, "drip").unwrap();
                }
            });
        }
    });

    assert_eq!(w.service.player(player).unwrap().tokens, 300);
    assert_eq!(w.service.transactions(player).unwrap().len(), 200);
    assert!(w.service.reconcile().unwrap().is_balanced());
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

#[test]
fn tokens_earned_granted_exactly_at_threshold_and_once() {
    let w = world();
    let pocket = achievement("Pocket Money", AchievementKind::TokensEarned, 500, 50, 0);
    w.service
        .seed_catalog(Vec::new(), Vec::new(), vec![pocket.clone()])
        .unwrap();
    let player = new_player(&w);

    w.service.add_tokens(player, 499, "grant").unwrap();
    assert!(w.service.check_achievements(player).unwrap().is_empty());

    // Level-up bonuses do not count toward tokens earned.
    w.service.add_experience(player, 5000).unwrap();
    assert!(w.service.check_achievements(player).unwrap().is_empty());

    w.service.add_tokens(player, 1, "grant").unwrap();
    let earned = w.service.check_achievements(player).unwrap();
    assert_eq!(earned.len(), 1);
    assert_eq!(earned[0].id, pocket.id);

    assert!(w.service.check_achievements(player).unwrap().is_empty());
    assert_eq!(
        w.service.store().earned_achievements(player).unwrap().len(),
        1
    );
    let rewards = w
        .service
        .transactions(player)
        .unwrap()
        .into_iter()
        .filter(|t| t.transaction_type == TransactionType::AchievementReward)
        .count();
    assert_eq!(rewards, 1);
}

#[test]
fn achievement_rewards_cascade_within_one_check() {
    let first_sale = achievement("First Sale", AchievementKind::SalesMilestone, 1, 10, 1000);
    let level_two = achievement("Level Two", AchievementKind::LevelMilestone, 2, 5, 0);
    let (w, kush, yard) = garden(vec![first_sale.clone(), level_two.clone()]);
    let player = new_player(&w);
    let plant_id = grow_and_harvest(&w, player, &kush, &yard);

    let outcome = w.service.sell_plant(player, plant_id, yard.id).unwrap();
    let names: Vec<_> = outcome.achievements.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["First Sale", "Level Two"]);

    let after = w.service.player(player).unwrap();
    assert_eq!(after.level, 2);
    assert_eq!(after.tokens, 80 + outcome.tokens + 10 + 50 + 5);
    assert!(w.service.reconcile().unwrap().is_balanced());
}

#[test]
fn achievement_unlocks_a_gated_location() {
    let w = world();
    let kush = strain("Kush", 5, 10, 1);
    let greenhouse = location("Greenhouse", 500, 4);
    let mut key = achievement("Green Key", AchievementKind::LevelMilestone, 2, 0, 0);
    key.unlock_location_id = Some(greenhouse.id);
    w.service
        .seed_catalog(vec![kush.clone()], vec![greenhouse.clone()], vec![key])
        .unwrap();
    let player = new_player(&w);

    assert!(matches!(
        w.service.plant_seed(player, kush.id, greenhouse.id),
        Err(GameError::LocationLocked { .. })
    ));
    assert!(w.service.available_locations(player).unwrap().is_empty());

    w.service.add_experience(player, 1000).unwrap();

    let after = w.service.player(player).unwrap();
    assert_eq!(after.unlocked_locations, vec![greenhouse.id]);
    assert_eq!(after.reputation, 100);
    assert_eq!(w.service.available_locations(player).unwrap().len(), 1);
    assert!(w.service.plant_seed(player, kush.id, greenhouse.id).is_ok());
}

#[test]
fn strain_collection_counts_distinct_strains() {
    let w = world();
    let strains = vec![
        strain("One", 5, 1, 1),
        strain("Two", 5, 1, 1),
        strain("Three", 5, 1, 1),
    ];
    let yard = location("Yard", 0, 10);
    let collector = achievement("Collector", AchievementKind::StrainCollection, 3, 0, 10);
    w.service
        .seed_catalog(strains.clone(), vec![yard.clone()], vec![collector])
        .unwrap();
    let player = new_player(&w);

    w.service.plant_seed(player, strains[0].id, yard.id).unwrap();
    w.service.plant_seed(player, strains[0].id, yard.id).unwrap();
    w.service.plant_seed(player, strains[1].id, yard.id).unwrap();
    assert!(w.service.check_achievements(player).unwrap().is_empty());

    w.service.plant_seed(player, strains[2].id, yard.id).unwrap();
    assert_eq!(w.service.check_achievements(player).unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Market and weather
// ---------------------------------------------------------------------------

#[test]
fn market_sweep_keeps_modifiers_in_bounds() {
    for seed in 0..20_u64 {
        let w = world_with(Box::new(SeededRandom::from_seed(seed)));
        w.service
            .seed_catalog(starter_strains(), starter_locations(), starter_achievements())
            .unwrap();
        assert_eq!(w.service.run_market_sweep().unwrap(), 24);

        for site in w.service.store().locations().unwrap() {
            for row in w.service.market_prices(site.id).unwrap() {
                assert!((0.5..=2.0).contains(&row.price_modifier));
                assert!((0.01..=1.0).contains(&row.demand_level));
                assert!((0.01..=1.0).contains(&row.supply_level));
            }
        }
    }
}

#[test]
fn market_sweeps_build_a_pruned_price_history() {
    let (w, kush, yard) = garden(Vec::new());
    w.service.run_market_sweep().unwrap();
    w.clock.advance(Duration::days(1));
    w.service.run_market_sweep().unwrap();

    let week = w.service.price_history(kush.id, Some(yard.id), 7).unwrap();
    assert_eq!(week.len(), 2);
    assert!(week[0].recorded_at < week[1].recorded_at);
    let current = w.service.price_modifier(yard.id, kush.id);
    assert!((week[1].price_modifier - current).abs() < f64::EPSILON);
    assert_eq!(w.service.price_history(kush.id, None, 7).unwrap().len(), 2);
    assert!(
        w.service
            .price_history(kush.id, Some(LocationId::new()), 7)
            .unwrap()
            .is_empty()
    );

    w.clock.advance(Duration::days(30));
    w.service.run_market_sweep().unwrap();
    let kept = w.service.price_history(kush.id, Some(yard.id), 90).unwrap();
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[1].recorded_at, w.service.now());

    assert!(matches!(
        w.service.price_history(StrainId::new(), None, 7),
        Err(GameError::NotFound { .. })
    ));
}

#[test]
fn forecast_and_early_end_of_weather() {
    let w = world();
    let now = w.service.now();
    let storm = WeatherEffect::new(
        WeatherKind::RainStorm,
        Severity::Mild,
        now - Duration::hours(1),
        now + Duration::hours(3),
    );
    let storm_id = storm.id;
    w.board.add(storm);
    w.board.add(WeatherEffect::new(
        WeatherKind::Sunny,
        Severity::Mild,
        now + Duration::hours(6),
        now + Duration::hours(12),
    ));

    assert!(w.service.weather_forecast(&w.board, 4).is_empty());
    assert_eq!(w.service.weather_forecast(&w.board, 24).len(), 1);

    assert_eq!(w.service.active_weather().len(), 1);
    assert!(w.service.end_weather_effect(&w.board, storm_id));
    assert!(w.service.active_weather().is_empty());
    assert!(!w.service.end_weather_effect(&w.board, storm_id));
}

#[test]
fn weather_cycle_starts_an_effect_on_a_clear_board() {
    let w = world();
    let started = w.service.run_weather_cycle(&w.board);
    assert!(!started.is_empty());
    assert!(!w.service.active_weather().is_empty());

    w.clock.advance(Duration::days(2));
    assert!(w.service.active_weather().is_empty());
}

#[test]
fn ledger_reconciles_after_a_full_season() {
    let (w, kush, yard) = garden(starter_achievements());
    let player = new_player(&w);
    for _ in 0..3 {
        let plant_id = grow_and_harvest(&w, player, &kush, &yard);
        w.service.sell_plant(player, plant_id, yard.id).unwrap();
    }
    w.service.add_tokens(player, 40, "bonus").unwrap();

    match w.service.reconcile().unwrap() {
        ReconcileResult::Balanced => {}
        ReconcileResult::Anomaly(anomaly) => panic!("{}", anomaly.message),
    }
}
