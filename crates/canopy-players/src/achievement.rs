//! Achievement predicates over live player aggregates.
//!
//! | Kind                | Aggregate                                          |
//! |---------------------|----------------------------------------------------|
//! | `level_milestone`   | player level                                       |
//! | `sales_milestone`   | number of sale rows                                |
//! | `tokens_earned`     | ledger sum of `plant_sale` + `token_purchase`      |
//! | `strain_collection` | distinct strains across the player's plants       |
//!
//! An achievement is met when its aggregate reaches `requirement_value`.
//! Aggregates are recomputed from rows on every check.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use canopy_ledger::Ledger;
use canopy_types::{Achievement, AchievementId, AchievementKind, Plant, Player};

/// Snapshot of the aggregates achievements are judged on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementProgress {
    /// Current level.
    pub level: u32,
    /// Number of sales.
    pub sales_count: u64,
    /// Ledger total of sale and purchase credits.
    pub tokens_earned: i64,
    /// Distinct strains ever planted.
    pub distinct_strains: u64,
}

impl AchievementProgress {
    /// Gather aggregates for a player.
    ///
    /// `plants` may include other players' plants; they are filtered out.
    pub fn gather<'a>(
        player: &Player,
        sales_count: usize,
        plants: impl IntoIterator<Item = &'a Plant>,
        ledger: &Ledger,
    ) -> Self {
        let strains: BTreeSet<_> = plants
            .into_iter()
            .filter(|p| p.player_id == player.id)
            .map(|p| p.strain_id)
            .collect();

        Self {
            level: player.level,
            sales_count: u64::try_from(sales_count).unwrap_or(u64::MAX),
            tokens_earned: ledger.tokens_earned(player.id),
            distinct_strains: u64::try_from(strains.len()).unwrap_or(u64::MAX),
        }
    }

    /// The aggregate value a kind of achievement is compared against.
    ///
    /// A negative ledger total counts as zero.
    pub fn value_for(&self, kind: AchievementKind) -> u64 {
        match kind {
            AchievementKind::LevelMilestone => u64::from(self.level),
            AchievementKind::SalesMilestone => self.sales_count,
            AchievementKind::TokensEarned => u64::try_from(self.tokens_earned).unwrap_or(0),
            AchievementKind::StrainCollection => self.distinct_strains,
        }
    }
}

/// Whether the aggregates satisfy an achievement's threshold.
pub fn is_met(achievement: &Achievement, progress: &AchievementProgress) -> bool {
    progress.value_for(achievement.kind) >= achievement.requirement_value
}

/// Achievements not yet earned whose thresholds are now met.
pub fn newly_met<'a>(
    achievements: &'a [Achievement],
    earned: &BTreeSet<AchievementId>,
    progress: &AchievementProgress,
) -> Vec<&'a Achievement> {
    achievements
        .iter()
        .filter(|a| !earned.contains(&a.id) && is_met(a, progress))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use canopy_types::{LocationId, PlantId, PlayerId, SaleId, Stage, StrainId, UserId};

    use super::*;
    use crate::progression::new_player;

    fn achievement(kind: AchievementKind, requirement_value: u64) -> Achievement {
        Achievement {
            id: AchievementId::new(),
            name: "Test".to_owned(),
            description: "Test".to_owned(),
            kind,
            requirement_value,
            reward_tokens: 10,
            reward_experience: 10,
            unlock_location_id: None,
        }
    }

    fn plant(owner: PlayerId, strain_id: StrainId) -> Plant {
        let now = Utc::now();
        Plant {
            id: PlantId::new(),
            player_id: owner,
            strain_id,
            location_id: LocationId::new(),
            stage: Stage::Seedling,
            health: 1.0,
            planted_at: now,
            harvest_ready_at: now,
            harvested_at: None,
            sold_at: None,
            final_weight: None,
            final_thc: None,
            final_quality: None,
            updated_at: now,
        }
    }

    #[test]
    fn tokens_earned_uses_ledger_credits_only() {
        let player = new_player(UserId::new(), 100, 100, Utc::now());
        let mut ledger = Ledger::new();
        let now = Utc::now();
        assert!(ledger.record_sale(player.id, 60, SaleId::new(), now).is_ok());
        assert!(ledger.record_level_up_bonus(player.id, 50, 2, now).is_ok());

        let progress = AchievementProgress::gather(&player, 1, std::iter::empty::<&Plant>(), &ledger);
        assert_eq!(progress.tokens_earned, 60);

        assert!(is_met(&achievement(AchievementKind::TokensEarned, 60), &progress));
        assert!(!is_met(&achievement(AchievementKind::TokensEarned, 61), &progress));
    }

    #[test]
    fn distinct_strains_ignore_duplicates_and_other_players() {
        let player = new_player(UserId::new(), 100, 100, Utc::now());
        let kush = StrainId::new();
        let haze = StrainId::new();
        let plants = [
            plant(player.id, kush),
            plant(player.id, kush),
            plant(player.id, haze),
            plant(PlayerId::new(), StrainId::new()),
        ];
        let progress = AchievementProgress::gather(&player, 0, &plants, &Ledger::new());
        assert_eq!(progress.distinct_strains, 2);
    }

    #[test]
    fn newly_met_skips_earned() {
        let progress = AchievementProgress {
            level: 5,
            sales_count: 10,
            tokens_earned: 0,
            distinct_strains: 0,
        };
        let level = achievement(AchievementKind::LevelMilestone, 5);
        let sales = achievement(AchievementKind::SalesMilestone, 10);
        let far = achievement(AchievementKind::SalesMilestone, 11);
        let earned = BTreeSet::from([level.id]);
        let all = [level, sales.clone(), far];

        let met: Vec<_> = newly_met(&all, &earned, &progress)
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(met, vec![sales.id]);
    }

    #[test]
    fn negative_ledger_total_counts_as_zero() {
        let progress = AchievementProgress {
            tokens_earned: -5,
            ..AchievementProgress::default()
        };
        assert_eq!(progress.value_for(AchievementKind::TokensEarned), 0);
    }
}
