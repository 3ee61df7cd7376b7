//! Player rows and earned achievements.

use canopy_types::{Player, PlayerAchievement};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::codec::{convert, decode_json, encode_json};
use crate::error::DbError;

/// Operations on the `players` and `player_achievements` tables.
pub struct PlayerStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PlayerStore<'a> {
    /// Create a player store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Write the latest version of each player.
    ///
    /// `user_id` and `created_at` never change after the first insert.
    pub async fn upsert_players(&self, players: &[Player]) -> Result<(), DbError> {
        if players.is_empty() {
            return Ok(());
        }

        let len = players.len();
        let mut ids = Vec::with_capacity(len);
        let mut user_ids = Vec::with_capacity(len);
        let mut tokens: Vec<i64> = Vec::with_capacity(len);
        let mut experience: Vec<i64> = Vec::with_capacity(len);
        let mut levels: Vec<i32> = Vec::with_capacity(len);
        let mut reputations = Vec::with_capacity(len);
        let mut impairments = Vec::with_capacity(len);
        let mut unlocked = Vec::with_capacity(len);
        let mut created = Vec::with_capacity(len);
        let mut updated = Vec::with_capacity(len);

        for player in players {
            ids.push(player.id.into_inner());
            user_ids.push(player.user_id.into_inner());
            tokens.push(convert("tokens", player.tokens)?);
            experience.push(convert("experience", player.experience)?);
            levels.push(convert("level", player.level)?);
            reputations.push(player.reputation);
            impairments.push(player.current_impairment);
            unlocked.push(encode_json(&player.unlocked_locations)?);
            created.push(player.created_at);
            updated.push(player.updated_at);
        }

        sqlx::query(
            r"INSERT INTO players (id, user_id, tokens, experience, level, reputation, current_impairment, unlocked_locations, created_at, updated_at)
              SELECT id, user_id, tokens, experience, level, reputation, current_impairment, unlocked::JSONB, created_at, updated_at
              FROM UNNEST($1::UUID[], $2::UUID[], $3::INT8[], $4::INT8[], $5::INT4[], $6::INT8[], $7::FLOAT8[], $8::TEXT[], $9::TIMESTAMPTZ[], $10::TIMESTAMPTZ[])
                AS t(id, user_id, tokens, experience, level, reputation, current_impairment, unlocked, created_at, updated_at)
              ON CONFLICT (id) DO UPDATE SET
                tokens = EXCLUDED.tokens,
                experience = EXCLUDED.experience,
                level = EXCLUDED.level,
                reputation = EXCLUDED.reputation,
                current_impairment = EXCLUDED.current_impairment,
                unlocked_locations = EXCLUDED.unlocked_locations,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(&ids)
        .bind(&user_ids)
        .bind(&tokens)
        .bind(&experience)
        .bind(&levels)
        .bind(&reputations)
        .bind(&impairments)
        .bind(&unlocked)
        .bind(&created)
        .bind(&updated)
        .execute(self.pool)
        .await?;

        tracing::debug!(count = len, "upserted players");
        Ok(())
    }

    /// Every player.
    pub async fn load_players(&self) -> Result<Vec<Player>, DbError> {
        let rows = sqlx::query_as::<_, PlayerRow>(
            r"SELECT id, user_id, tokens, experience, level, reputation, current_impairment,
                     unlocked_locations::TEXT AS unlocked_locations, created_at, updated_at
              FROM players
              ORDER BY created_at",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Player::try_from).collect()
    }

    /// Record earned achievements. Pairs already present are skipped.
    pub async fn insert_player_achievements(
        &self,
        earned: &[PlayerAchievement],
    ) -> Result<(), DbError> {
        if earned.is_empty() {
            return Ok(());
        }

        let player_ids: Vec<Uuid> = earned.iter().map(|e| e.player_id.into_inner()).collect();
        let achievement_ids: Vec<Uuid> =
            earned.iter().map(|e| e.achievement_id.into_inner()).collect();
        let earned_at: Vec<DateTime<Utc>> = earned.iter().map(|e| e.earned_at).collect();

        sqlx::query(
            r"INSERT INTO player_achievements (player_id, achievement_id, earned_at)
              SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::TIMESTAMPTZ[])
              ON CONFLICT (player_id, achievement_id) DO NOTHING",
        )
        .bind(&player_ids)
        .bind(&achievement_ids)
        .bind(&earned_at)
        .execute(self.pool)
        .await?;

        tracing::debug!(count = earned.len(), "inserted player achievements");
        Ok(())
    }

    /// Every earned (player, achievement) pair.
    pub async fn load_player_achievements(&self) -> Result<Vec<PlayerAchievement>, DbError> {
        let rows: Vec<(Uuid, Uuid, DateTime<Utc>)> = sqlx::query_as(
            r"SELECT player_id, achievement_id, earned_at
              FROM player_achievements
              ORDER BY earned_at",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(player_id, achievement_id, earned_at)| PlayerAchievement {
                player_id: player_id.into(),
                achievement_id: achievement_id.into(),
                earned_at,
            })
            .collect())
    }
}

/// A row from the `players` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlayerRow {
    /// Player UUID.
    pub id: Uuid,
    /// Owning user account.
    pub user_id: Uuid,
    /// Token balance.
    pub tokens: i64,
    /// Lifetime experience.
    pub experience: i64,
    /// Level derived from experience.
    pub level: i32,
    /// Reputation score.
    pub reputation: i64,
    /// Stored impairment value.
    pub current_impairment: f64,
    /// JSON array of location ids opened by achievements.
    pub unlocked_locations: String,
    /// When the player was provisioned.
    pub created_at: DateTime<Utc>,
    /// Last mutation.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PlayerRow> for Player {
    type Error = DbError;

    fn try_from(row: PlayerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            user_id: row.user_id.into(),
            tokens: convert("tokens", row.tokens)?,
            experience: convert("experience", row.experience)?,
            level: convert("level", row.level)?,
            reputation: row.reputation,
            current_impairment: row.current_impairment,
            unlocked_locations: decode_json(&row.unlocked_locations)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
