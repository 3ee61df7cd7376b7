//! Ledger persistence: batch-inserting and reading game transactions.
//!
//! The ledger is append-only. Entries are flushed in batches with a single
//! multi-row `UNNEST` insert per batch, each batch in its own transaction.
//! An entry id that is already stored is skipped, so a batch that is
//! flushed twice after a partial failure does not double-count.

use canopy_types::{GameTransaction, PlayerId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::codec::{decode_label, encode_label};
use crate::error::DbError;

/// Default batch size for ledger inserts.
const DEFAULT_BATCH_SIZE: usize = 100;

/// Operations on the `game_transactions` table.
pub struct LedgerStore<'a> {
    pool: &'a PgPool,
    batch_size: usize,
}

impl<'a> LedgerStore<'a> {
    /// Create a ledger store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size for inserts.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Batch-insert ledger entries.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if an insert fails. Batches committed
    /// before the failure stay committed.
    pub async fn batch_insert(&self, entries: &[GameTransaction]) -> Result<(), DbError> {
        if entries.is_empty() {
            return Ok(());
        }

        for chunk in entries.chunks(self.batch_size.max(1)) {
            let mut tx = self.pool.begin().await?;

            let len = chunk.len();
            let mut ids = Vec::with_capacity(len);
            let mut player_ids = Vec::with_capacity(len);
            let mut types = Vec::with_capacity(len);
            let mut amounts = Vec::with_capacity(len);
            let mut descriptions = Vec::with_capacity(len);
            let mut reference_ids: Vec<Option<Uuid>> = Vec::with_capacity(len);
            let mut timestamps = Vec::with_capacity(len);

            for entry in chunk {
                ids.push(entry.id.into_inner());
                player_ids.push(entry.player_id.into_inner());
                types.push(encode_label(&entry.transaction_type)?);
                amounts.push(entry.amount);
                descriptions.push(entry.description.clone());
                reference_ids.push(entry.reference_id);
                timestamps.push(entry.created_at);
            }

            sqlx::query(
                r"INSERT INTO game_transactions (id, player_id, transaction_type, amount, description, reference_id, created_at)
                  SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::TEXT[], $4::INT8[], $5::TEXT[], $6::UUID[], $7::TIMESTAMPTZ[])
                  ON CONFLICT (id) DO NOTHING",
            )
            .bind(&ids)
            .bind(&player_ids)
            .bind(&types)
            .bind(&amounts)
            .bind(&descriptions)
            .bind(&reference_ids)
            .bind(&timestamps)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
        }

        tracing::debug!(count = entries.len(), "inserted ledger entries (batch UNNEST)");
        Ok(())
    }

    /// Every ledger entry in insertion order.
    pub async fn load_all(&self) -> Result<Vec<GameTransaction>, DbError> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r"SELECT id, player_id, transaction_type, amount, description, reference_id, created_at
              FROM game_transactions
              ORDER BY created_at, id",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(GameTransaction::try_from).collect()
    }

    /// One player's entries, oldest first.
    pub async fn entries_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Vec<GameTransaction>, DbError> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r"SELECT id, player_id, transaction_type, amount, description, reference_id, created_at
              FROM game_transactions
              WHERE player_id = $1
              ORDER BY created_at, id",
        )
        .bind(player_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(GameTransaction::try_from).collect()
    }

    /// Sum of a player's `plant_sale` and `token_purchase` entries.
    pub async fn tokens_earned(&self, player_id: PlayerId) -> Result<i64, DbError> {
        let total: Option<i64> = sqlx::query_scalar(
            r"SELECT SUM(amount)::BIGINT
              FROM game_transactions
              WHERE player_id = $1 AND transaction_type IN ('plant_sale', 'token_purchase')",
        )
        .bind(player_id.into_inner())
        .fetch_one(self.pool)
        .await?;
        Ok(total.unwrap_or(0))
    }
}

/// A row from the `game_transactions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerRow {
    /// Entry UUID.
    pub id: Uuid,
    /// Player whose balance changed.
    pub player_id: Uuid,
    /// Transaction type label.
    pub transaction_type: String,
    /// Signed token delta.
    pub amount: i64,
    /// Description.
    pub description: String,
    /// Related row, if any.
    pub reference_id: Option<Uuid>,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for GameTransaction {
    type Error = DbError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            player_id: row.player_id.into(),
            transaction_type: decode_label(row.transaction_type)?,
            amount: row.amount,
            description: row.description,
            reference_id: row.reference_id,
            created_at: row.created_at,
        })
    }
}
