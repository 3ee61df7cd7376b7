//! Plants and the sales that close them out.
//!
//! Plants are mutable until sold and are upserted by id. Sales are
//! immutable; re-flushing a sale that already landed is a no-op.

use canopy_types::{Plant, Sale};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::codec::{convert, decode_label, encode_label};
use crate::error::DbError;

/// Default batch size for plant upserts.
const DEFAULT_BATCH_SIZE: usize = 500;

/// Operations on the `plants` and `sales` tables.
pub struct PlantStore<'a> {
    pool: &'a PgPool,
    batch_size: usize,
}

impl<'a> PlantStore<'a> {
    /// Create a plant store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size for upserts.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Write the latest version of each plant, in batches.
    pub async fn upsert_plants(&self, plants: &[Plant]) -> Result<(), DbError> {
        if plants.is_empty() {
            return Ok(());
        }

        for chunk in plants.chunks(self.batch_size.max(1)) {
            let len = chunk.len();
            let mut ids = Vec::with_capacity(len);
            let mut player_ids = Vec::with_capacity(len);
            let mut strain_ids = Vec::with_capacity(len);
            let mut location_ids = Vec::with_capacity(len);
            let mut stages = Vec::with_capacity(len);
            let mut health = Vec::with_capacity(len);
            let mut planted_at = Vec::with_capacity(len);
            let mut ready_at = Vec::with_capacity(len);
            let mut harvested_at: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(len);
            let mut sold_at: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(len);
            let mut weights: Vec<Option<f64>> = Vec::with_capacity(len);
            let mut thc: Vec<Option<f64>> = Vec::with_capacity(len);
            let mut quality: Vec<Option<f64>> = Vec::with_capacity(len);
            let mut updated_at = Vec::with_capacity(len);

            for plant in chunk {
                ids.push(plant.id.into_inner());
                player_ids.push(plant.player_id.into_inner());
                strain_ids.push(plant.strain_id.into_inner());
                location_ids.push(plant.location_id.into_inner());
                stages.push(encode_label(&plant.stage)?);
                health.push(plant.health);
                planted_at.push(plant.planted_at);
                ready_at.push(plant.harvest_ready_at);
                harvested_at.push(plant.harvested_at);
                sold_at.push(plant.sold_at);
                weights.push(plant.final_weight);
                thc.push(plant.final_thc);
                quality.push(plant.final_quality);
                updated_at.push(plant.updated_at);
            }

            sqlx::query(
                r"INSERT INTO plants (id, player_id, strain_id, location_id, stage, health, planted_at, harvest_ready_at, harvested_at, sold_at, final_weight, final_thc, final_quality, updated_at)
                  SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::UUID[], $4::UUID[], $5::TEXT[], $6::FLOAT8[], $7::TIMESTAMPTZ[], $8::TIMESTAMPTZ[], $9::TIMESTAMPTZ[], $10::TIMESTAMPTZ[], $11::FLOAT8[], $12::FLOAT8[], $13::FLOAT8[], $14::TIMESTAMPTZ[])
                  ON CONFLICT (id) DO UPDATE SET
                    stage = EXCLUDED.stage,
                    health = EXCLUDED.health,
                    harvested_at = EXCLUDED.harvested_at,
                    sold_at = EXCLUDED.sold_at,
                    final_weight = EXCLUDED.final_weight,
                    final_thc = EXCLUDED.final_thc,
                    final_quality = EXCLUDED.final_quality,
                    updated_at = EXCLUDED.updated_at",
            )
            .bind(&ids)
            .bind(&player_ids)
            .bind(&strain_ids)
            .bind(&location_ids)
            .bind(&stages)
            .bind(&health)
            .bind(&planted_at)
            .bind(&ready_at)
            .bind(&harvested_at)
            .bind(&sold_at)
            .bind(&weights)
            .bind(&thc)
            .bind(&quality)
            .bind(&updated_at)
            .execute(self.pool)
            .await?;
        }

        tracing::debug!(count = plants.len(), "upserted plants");
        Ok(())
    }

    /// Every plant, oldest first.
    pub async fn load_plants(&self) -> Result<Vec<Plant>, DbError> {
        let rows = sqlx::query_as::<_, PlantRow>(
            r"SELECT id, player_id, strain_id, location_id, stage, health, planted_at, harvest_ready_at, harvested_at, sold_at, final_weight, final_thc, final_quality, updated_at
              FROM plants
              ORDER BY planted_at",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Plant::try_from).collect()
    }

    /// Append sales. Sales already stored are skipped.
    pub async fn insert_sales(&self, sales: &[Sale]) -> Result<(), DbError> {
        if sales.is_empty() {
            return Ok(());
        }

        let len = sales.len();
        let mut ids = Vec::with_capacity(len);
        let mut player_ids = Vec::with_capacity(len);
        let mut plant_ids = Vec::with_capacity(len);
        let mut location_ids = Vec::with_capacity(len);
        let mut quantities = Vec::with_capacity(len);
        let mut qualities = Vec::with_capacity(len);
        let mut base_prices = Vec::with_capacity(len);
        let mut final_prices = Vec::with_capacity(len);
        let mut experience: Vec<i64> = Vec::with_capacity(len);
        let mut reputation = Vec::with_capacity(len);
        let mut sold_at = Vec::with_capacity(len);

        for sale in sales {
            ids.push(sale.id.into_inner());
            player_ids.push(sale.player_id.into_inner());
            plant_ids.push(sale.plant_id.into_inner());
            location_ids.push(sale.location_id.into_inner());
            quantities.push(sale.quantity);
            qualities.push(sale.quality);
            base_prices.push(sale.base_price);
            final_prices.push(sale.final_price);
            experience.push(convert("experience_gained", sale.experience_gained)?);
            reputation.push(sale.reputation_gained);
            sold_at.push(sale.sold_at);
        }

        sqlx::query(
            r"INSERT INTO sales (id, player_id, plant_id, location_id, quantity, quality, base_price, final_price, experience_gained, reputation_gained, sold_at)
              SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::UUID[], $4::UUID[], $5::FLOAT8[], $6::FLOAT8[], $7::FLOAT8[], $8::FLOAT8[], $9::INT8[], $10::INT8[], $11::TIMESTAMPTZ[])
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(&ids)
        .bind(&player_ids)
        .bind(&plant_ids)
        .bind(&location_ids)
        .bind(&quantities)
        .bind(&qualities)
        .bind(&base_prices)
        .bind(&final_prices)
        .bind(&experience)
        .bind(&reputation)
        .bind(&sold_at)
        .execute(self.pool)
        .await?;

        tracing::debug!(count = len, "inserted sales");
        Ok(())
    }

    /// Every sale, oldest first.
    pub async fn load_sales(&self) -> Result<Vec<Sale>, DbError> {
        let rows = sqlx::query_as::<_, SaleRow>(
            r"SELECT id, player_id, plant_id, location_id, quantity, quality, base_price, final_price, experience_gained, reputation_gained, sold_at
              FROM sales
              ORDER BY sold_at",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Sale::try_from).collect()
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A row from the `plants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlantRow {
    /// Plant UUID.
    pub id: Uuid,
    /// Owner.
    pub player_id: Uuid,
    /// Strain grown.
    pub strain_id: Uuid,
    /// Where it grows.
    pub location_id: Uuid,
    /// Stage label.
    pub stage: String,
    /// Health in `[0, 1]`.
    pub health: f64,
    /// Planting time.
    pub planted_at: DateTime<Utc>,
    /// Planned end of the growing window.
    pub harvest_ready_at: DateTime<Utc>,
    /// Harvest time, once harvested.
    pub harvested_at: Option<DateTime<Utc>>,
    /// Sale time, once sold.
    pub sold_at: Option<DateTime<Utc>>,
    /// Harvested weight.
    pub final_weight: Option<f64>,
    /// Harvested THC.
    pub final_thc: Option<f64>,
    /// Harvested quality.
    pub final_quality: Option<f64>,
    /// Last mutation.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PlantRow> for Plant {
    type Error = DbError;

    fn try_from(row: PlantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            player_id: row.player_id.into(),
            strain_id: row.strain_id.into(),
            location_id: row.location_id.into(),
            stage: decode_label(row.stage)?,
            health: row.health,
            planted_at: row.planted_at,
            harvest_ready_at: row.harvest_ready_at,
            harvested_at: row.harvested_at,
            sold_at: row.sold_at,
            final_weight: row.final_weight,
            final_thc: row.final_thc,
            final_quality: row.final_quality,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `sales` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SaleRow {
    /// Sale UUID.
    pub id: Uuid,
    /// Seller.
    pub player_id: Uuid,
    /// Plant sold.
    pub plant_id: Uuid,
    /// Where it was sold.
    pub location_id: Uuid,
    /// Grams sold.
    pub quantity: f64,
    /// Quality at sale.
    pub quality: f64,
    /// Price before modifiers.
    pub base_price: f64,
    /// Price after modifiers.
    pub final_price: f64,
    /// Experience awarded.
    pub experience_gained: i64,
    /// Reputation awarded.
    pub reputation_gained: i64,
    /// Sale time.
    pub sold_at: DateTime<Utc>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = DbError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            player_id: row.player_id.into(),
            plant_id: row.plant_id.into(),
            location_id: row.location_id.into(),
            quantity: row.quantity,
            quality: row.quality,
            base_price: row.base_price,
            final_price: row.final_price,
            experience_gained: convert("experience_gained", row.experience_gained)?,
            reputation_gained: row.reputation_gained,
            sold_at: row.sold_at,
        })
    }
}
