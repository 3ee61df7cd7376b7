//! Market condition rows, keyed by (location, strain), and the price
//! history the sweep appends to.

use canopy_types::{MarketCondition, PricePoint};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `market_conditions` and `price_history` tables.
pub struct MarketStore<'a> {
    pool: &'a PgPool,
}

impl<'a> MarketStore<'a> {
    /// Create a market store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Replace the rows for every pair in `conditions`.
    pub async fn upsert_conditions(&self, conditions: &[MarketCondition]) -> Result<(), DbError> {
        if conditions.is_empty() {
            return Ok(());
        }

        let len = conditions.len();
        let mut location_ids = Vec::with_capacity(len);
        let mut strain_ids = Vec::with_capacity(len);
        let mut demand = Vec::with_capacity(len);
        let mut supply = Vec::with_capacity(len);
        let mut modifiers = Vec::with_capacity(len);
        let mut updated_at = Vec::with_capacity(len);

        for condition in conditions {
            location_ids.push(condition.location_id.into_inner());
            strain_ids.push(condition.strain_id.into_inner());
            demand.push(condition.demand_level);
            supply.push(condition.supply_level);
            modifiers.push(condition.price_modifier);
            updated_at.push(condition.updated_at);
        }

        sqlx::query(
            r"INSERT INTO market_conditions (location_id, strain_id, demand_level, supply_level, price_modifier, updated_at)
              SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::FLOAT8[], $4::FLOAT8[], $5::FLOAT8[], $6::TIMESTAMPTZ[])
              ON CONFLICT (location_id, strain_id) DO UPDATE SET
                demand_level = EXCLUDED.demand_level,
                supply_level = EXCLUDED.supply_level,
                price_modifier = EXCLUDED.price_modifier,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(&location_ids)
        .bind(&strain_ids)
        .bind(&demand)
        .bind(&supply)
        .bind(&modifiers)
        .bind(&updated_at)
        .execute(self.pool)
        .await?;

        tracing::debug!(count = len, "upserted market conditions");
        Ok(())
    }

    /// Every market row.
    pub async fn load_conditions(&self) -> Result<Vec<MarketCondition>, DbError> {
        let rows = sqlx::query_as::<_, MarketRow>(
            r"SELECT location_id, strain_id, demand_level, supply_level, price_modifier, updated_at
              FROM market_conditions",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(MarketCondition::from).collect())
    }

    /// Append sweep samples. A point already stored for the same pair and
    /// instant is skipped, so a re-queued flush is harmless.
    pub async fn insert_price_points(&self, points: &[PricePoint]) -> Result<(), DbError> {
        if points.is_empty() {
            return Ok(());
        }

        let len = points.len();
        let mut location_ids = Vec::with_capacity(len);
        let mut strain_ids = Vec::with_capacity(len);
        let mut modifiers = Vec::with_capacity(len);
        let mut supply = Vec::with_capacity(len);
        let mut demand = Vec::with_capacity(len);
        let mut recorded_at = Vec::with_capacity(len);

        for point in points {
            location_ids.push(point.location_id.into_inner());
            strain_ids.push(point.strain_id.into_inner());
            modifiers.push(point.price_modifier);
            supply.push(point.supply_level);
            demand.push(point.demand_level);
            recorded_at.push(point.recorded_at);
        }

        sqlx::query(
            r"INSERT INTO price_history (location_id, strain_id, price_modifier, supply_level, demand_level, recorded_at)
              SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::FLOAT8[], $4::FLOAT8[], $5::FLOAT8[], $6::TIMESTAMPTZ[])
              ON CONFLICT (location_id, strain_id, recorded_at) DO NOTHING",
        )
        .bind(&location_ids)
        .bind(&strain_ids)
        .bind(&modifiers)
        .bind(&supply)
        .bind(&demand)
        .bind(&recorded_at)
        .execute(self.pool)
        .await?;

        tracing::debug!(count = len, "inserted price points");
        Ok(())
    }

    /// Delete history recorded before `cutoff`. Returns the rows removed.
    pub async fn delete_price_history_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM price_history WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// History recorded at or after `since`, oldest first.
    pub async fn load_price_history(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, DbError> {
        let rows = sqlx::query_as::<_, PricePointRow>(
            r"SELECT location_id, strain_id, price_modifier, supply_level, demand_level, recorded_at
              FROM price_history
              WHERE recorded_at >= $1
              ORDER BY recorded_at",
        )
        .bind(since)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(PricePoint::from).collect())
    }
}

/// A row from the `market_conditions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MarketRow {
    /// Location half of the key.
    pub location_id: Uuid,
    /// Strain half of the key.
    pub strain_id: Uuid,
    /// Demand level.
    pub demand_level: f64,
    /// Supply level.
    pub supply_level: f64,
    /// Clamped price multiplier.
    pub price_modifier: f64,
    /// Last sweep that touched the row.
    pub updated_at: DateTime<Utc>,
}

impl From<MarketRow> for MarketCondition {
    fn from(row: MarketRow) -> Self {
        Self {
            location_id: row.location_id.into(),
            strain_id: row.strain_id.into(),
            demand_level: row.demand_level,
            supply_level: row.supply_level,
            price_modifier: row.price_modifier,
            updated_at: row.updated_at,
        }
    }
}

/// A row from the `price_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PricePointRow {
    /// Location half of the key.
    pub location_id: Uuid,
    /// Strain half of the key.
    pub strain_id: Uuid,
    /// Price multiplier at the sample.
    pub price_modifier: f64,
    /// Supply at the sample.
    pub supply_level: f64,
    /// Demand at the sample.
    pub demand_level: f64,
    /// When the sweep ran.
    pub recorded_at: DateTime<Utc>,
}

impl From<PricePointRow> for PricePoint {
    fn from(row: PricePointRow) -> Self {
        Self {
            location_id: row.location_id.into(),
            strain_id: row.strain_id.into(),
            price_modifier: row.price_modifier,
            supply_level: row.supply_level,
            demand_level: row.demand_level,
            recorded_at: row.recorded_at,
        }
    }
}
