//! Reference data: strains, locations and achievement definitions.
//!
//! Reference rows are written rarely (on first start, or when an operator
//! edits the catalog) so each batch is a single `UNNEST` upsert keyed on
//! the row id.

use canopy_types::{Achievement, Location, LocationId, Strain};
use sqlx::PgPool;
use uuid::Uuid;

use crate::codec::{convert, decode_label, encode_label};
use crate::error::DbError;

/// Operations on the `strains`, `locations` and `achievements` tables.
pub struct CatalogStore<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogStore<'a> {
    /// Create a catalog store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // -----------------------------------------------------------------------
    // Strains
    // -----------------------------------------------------------------------

    /// Insert or replace strain rows.
    pub async fn upsert_strains(&self, strains: &[Strain]) -> Result<(), DbError> {
        if strains.is_empty() {
            return Ok(());
        }

        let len = strains.len();
        let mut ids = Vec::with_capacity(len);
        let mut names = Vec::with_capacity(len);
        let mut types = Vec::with_capacity(len);
        let mut thc_min = Vec::with_capacity(len);
        let mut thc_max = Vec::with_capacity(len);
        let mut yield_min = Vec::with_capacity(len);
        let mut yield_max = Vec::with_capacity(len);
        let mut days_min: Vec<i32> = Vec::with_capacity(len);
        let mut days_max: Vec<i32> = Vec::with_capacity(len);
        let mut unlock: Vec<i32> = Vec::with_capacity(len);
        let mut prices: Vec<i64> = Vec::with_capacity(len);
        let mut rarities = Vec::with_capacity(len);

        for strain in strains {
            ids.push(strain.id.into_inner());
            names.push(strain.name.clone());
            types.push(encode_label(&strain.strain_type)?);
            thc_min.push(strain.thc_min);
            thc_max.push(strain.thc_max);
            yield_min.push(strain.yield_min);
            yield_max.push(strain.yield_max);
            days_min.push(convert("flowering_time_min", strain.flowering_time_min)?);
            days_max.push(convert("flowering_time_max", strain.flowering_time_max)?);
            unlock.push(convert("unlock_level", strain.unlock_level)?);
            prices.push(convert("seed_price", strain.seed_price)?);
            rarities.push(encode_label(&strain.rarity)?);
        }

        sqlx::query(
            r"INSERT INTO strains (id, name, strain_type, thc_min, thc_max, yield_min, yield_max, flowering_time_min, flowering_time_max, unlock_level, seed_price, rarity)
              SELECT * FROM UNNEST($1::UUID[], $2::TEXT[], $3::TEXT[], $4::FLOAT8[], $5::FLOAT8[], $6::FLOAT8[], $7::FLOAT8[], $8::INT4[], $9::INT4[], $10::INT4[], $11::INT8[], $12::TEXT[])
              ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                strain_type = EXCLUDED.strain_type,
                thc_min = EXCLUDED.thc_min,
                thc_max = EXCLUDED.thc_max,
                yield_min = EXCLUDED.yield_min,
                yield_max = EXCLUDED.yield_max,
                flowering_time_min = EXCLUDED.flowering_time_min,
                flowering_time_max = EXCLUDED.flowering_time_max,
                unlock_level = EXCLUDED.unlock_level,
                seed_price = EXCLUDED.seed_price,
                rarity = EXCLUDED.rarity",
        )
        .bind(&ids)
        .bind(&names)
        .bind(&types)
        .bind(&thc_min)
        .bind(&thc_max)
        .bind(&yield_min)
        .bind(&yield_max)
        .bind(&days_min)
        .bind(&days_max)
        .bind(&unlock)
        .bind(&prices)
        .bind(&rarities)
        .execute(self.pool)
        .await?;

        tracing::debug!(count = len, "upserted strains");
        Ok(())
    }

    /// Every strain, by name.
    pub async fn load_strains(&self) -> Result<Vec<Strain>, DbError> {
        let rows = sqlx::query_as::<_, StrainRow>(
            r"SELECT id, name, strain_type, thc_min, thc_max, yield_min, yield_max, flowering_time_min, flowering_time_max, unlock_level, seed_price, rarity
              FROM strains
              ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Strain::try_from).collect()
    }

    // -----------------------------------------------------------------------
    // Locations
    // -----------------------------------------------------------------------

    /// Insert or replace location rows.
    pub async fn upsert_locations(&self, locations: &[Location]) -> Result<(), DbError> {
        if locations.is_empty() {
            return Ok(());
        }

        let len = locations.len();
        let mut ids = Vec::with_capacity(len);
        let mut names = Vec::with_capacity(len);
        let mut modifiers = Vec::with_capacity(len);
        let mut levels: Vec<i32> = Vec::with_capacity(len);
        let mut reputations = Vec::with_capacity(len);
        let mut capacities: Vec<i32> = Vec::with_capacity(len);

        for location in locations {
            ids.push(location.id.into_inner());
            names.push(location.name.clone());
            modifiers.push(location.market_modifier);
            levels.push(convert("required_level", location.required_level)?);
            reputations.push(location.required_reputation);
            capacities.push(convert("max_plants", location.max_plants)?);
        }

        sqlx::query(
            r"INSERT INTO locations (id, name, market_modifier, required_level, required_reputation, max_plants)
              SELECT * FROM UNNEST($1::UUID[], $2::TEXT[], $3::FLOAT8[], $4::INT4[], $5::INT8[], $6::INT4[])
              ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                market_modifier = EXCLUDED.market_modifier,
                required_level = EXCLUDED.required_level,
                required_reputation = EXCLUDED.required_reputation,
                max_plants = EXCLUDED.max_plants",
        )
        .bind(&ids)
        .bind(&names)
        .bind(&modifiers)
        .bind(&levels)
        .bind(&reputations)
        .bind(&capacities)
        .execute(self.pool)
        .await?;

        tracing::debug!(count = len, "upserted locations");
        Ok(())
    }

    /// Every location, by required level.
    pub async fn load_locations(&self) -> Result<Vec<Location>, DbError> {
        let rows = sqlx::query_as::<_, LocationRow>(
            r"SELECT id, name, market_modifier, required_level, required_reputation, max_plants
              FROM locations
              ORDER BY required_level, name",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Location::try_from).collect()
    }

    // -----------------------------------------------------------------------
    // Achievements
    // -----------------------------------------------------------------------

    /// Insert or replace achievement definitions.
    pub async fn upsert_achievements(&self, achievements: &[Achievement]) -> Result<(), DbError> {
        if achievements.is_empty() {
            return Ok(());
        }

        let len = achievements.len();
        let mut ids = Vec::with_capacity(len);
        let mut names = Vec::with_capacity(len);
        let mut descriptions = Vec::with_capacity(len);
        let mut kinds = Vec::with_capacity(len);
        let mut requirements: Vec<i64> = Vec::with_capacity(len);
        let mut reward_tokens: Vec<i64> = Vec::with_capacity(len);
        let mut reward_experience: Vec<i64> = Vec::with_capacity(len);
        let mut unlocks: Vec<Option<Uuid>> = Vec::with_capacity(len);

        for achievement in achievements {
            ids.push(achievement.id.into_inner());
            names.push(achievement.name.clone());
            descriptions.push(achievement.description.clone());
            kinds.push(encode_label(&achievement.kind)?);
            requirements.push(convert("requirement_value", achievement.requirement_value)?);
            reward_tokens.push(convert("reward_tokens", achievement.reward_tokens)?);
            reward_experience.push(convert("reward_experience", achievement.reward_experience)?);
            unlocks.push(achievement.unlock_location_id.map(LocationId::into_inner));
        }

        sqlx::query(
            r"INSERT INTO achievements (id, name, description, kind, requirement_value, reward_tokens, reward_experience, unlock_location_id)
              SELECT * FROM UNNEST($1::UUID[], $2::TEXT[], $3::TEXT[], $4::TEXT[], $5::INT8[], $6::INT8[], $7::INT8[], $8::UUID[])
              ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                kind = EXCLUDED.kind,
                requirement_value = EXCLUDED.requirement_value,
                reward_tokens = EXCLUDED.reward_tokens,
                reward_experience = EXCLUDED.reward_experience,
                unlock_location_id = EXCLUDED.unlock_location_id",
        )
        .bind(&ids)
        .bind(&names)
        .bind(&descriptions)
        .bind(&kinds)
        .bind(&requirements)
        .bind(&reward_tokens)
        .bind(&reward_experience)
        .bind(&unlocks)
        .execute(self.pool)
        .await?;

        tracing::debug!(count = len, "upserted achievements");
        Ok(())
    }

    /// Every achievement definition.
    pub async fn load_achievements(&self) -> Result<Vec<Achievement>, DbError> {
        let rows = sqlx::query_as::<_, AchievementRow>(
            r"SELECT id, name, description, kind, requirement_value, reward_tokens, reward_experience, unlock_location_id
              FROM achievements
              ORDER BY kind, requirement_value",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Achievement::try_from).collect()
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A row from the `strains` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StrainRow {
    /// Strain UUID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// `indica`, `sativa` or `hybrid`.
    pub strain_type: String,
    /// Lower THC bound.
    pub thc_min: f64,
    /// Upper THC bound.
    pub thc_max: f64,
    /// Lower yield bound in grams.
    pub yield_min: f64,
    /// Upper yield bound in grams.
    pub yield_max: f64,
    /// Shortest growing window in days.
    pub flowering_time_min: i32,
    /// Longest growing window in days.
    pub flowering_time_max: i32,
    /// Minimum player level.
    pub unlock_level: i32,
    /// Seed price in tokens.
    pub seed_price: i64,
    /// Rarity label.
    pub rarity: String,
}

impl TryFrom<StrainRow> for Strain {
    type Error = DbError;

    fn try_from(row: StrainRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            name: row.name,
            strain_type: decode_label(row.strain_type)?,
            thc_min: row.thc_min,
            thc_max: row.thc_max,
            yield_min: row.yield_min,
            yield_max: row.yield_max,
            flowering_time_min: convert("flowering_time_min", row.flowering_time_min)?,
            flowering_time_max: convert("flowering_time_max", row.flowering_time_max)?,
            unlock_level: convert("unlock_level", row.unlock_level)?,
            seed_price: convert("seed_price", row.seed_price)?,
            rarity: decode_label(row.rarity)?,
        })
    }
}

/// A row from the `locations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LocationRow {
    /// Location UUID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Sale price multiplier.
    pub market_modifier: f64,
    /// Minimum player level.
    pub required_level: i32,
    /// Minimum reputation.
    pub required_reputation: i64,
    /// Growing plants allowed per player.
    pub max_plants: i32,
}

impl TryFrom<LocationRow> for Location {
    type Error = DbError;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            name: row.name,
            market_modifier: row.market_modifier,
            required_level: convert("required_level", row.required_level)?,
            required_reputation: row.required_reputation,
            max_plants: convert("max_plants", row.max_plants)?,
        })
    }
}

/// A row from the `achievements` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AchievementRow {
    /// Achievement UUID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Player-facing description.
    pub description: String,
    /// Aggregate kind label.
    pub kind: String,
    /// Threshold.
    pub requirement_value: i64,
    /// Token reward.
    pub reward_tokens: i64,
    /// Experience reward.
    pub reward_experience: i64,
    /// Location opened on grant, if any.
    pub unlock_location_id: Option<Uuid>,
}

impl TryFrom<AchievementRow> for Achievement {
    type Error = DbError;

    fn try_from(row: AchievementRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            kind: decode_label(row.kind)?,
            requirement_value: convert("requirement_value", row.requirement_value)?,
            reward_tokens: convert("reward_tokens", row.reward_tokens)?,
            reward_experience: convert("reward_experience", row.reward_experience)?,
            unlock_location_id: row.unlock_location_id.map(LocationId::from),
        })
    }
}
