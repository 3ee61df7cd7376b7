//! The token ledger: an append-only log of every balance change.
//!
//! The [`Ledger`] struct holds all [`GameTransaction`] values for the running
//! server and provides recording helpers for each entry type plus the
//! per-player aggregates that achievements and audits read.
//!
//! # Design
//!
//! - **Append-only**: entries are never modified or deleted.
//! - **Signed amounts**: credits positive, spends negative.
//! - **Cursor reads**: [`Ledger::entries_since`] lets the persistence layer
//!   ship new entries without copying the whole log.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use canopy_types::{AchievementId, GameTransaction, PlayerId, SaleId, StrainId, TransactionType};

use crate::{LedgerError, TransactionBuilder};

// ---------------------------------------------------------------------------
// Record parameters
// ---------------------------------------------------------------------------

/// Parameters for recording a general ledger entry.
pub struct RecordParams {
    /// Player whose balance changed.
    pub player_id: PlayerId,
    /// Category of the event.
    pub transaction_type: TransactionType,
    /// Signed token delta.
    pub amount: i64,
    /// Human-readable description.
    pub description: String,
    /// Related row, if any.
    pub reference_id: Option<Uuid>,
    /// When the event happened.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The ledger of all token movements in the game.
#[derive(Debug, Default)]
pub struct Ledger {
    /// All entries, in insertion order.
    entries: Vec<GameTransaction>,
}

impl Ledger {
    /// Create a new empty ledger.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Return the number of entries in the ledger.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return whether the ledger has no entries.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a pre-built entry (e.g. one loaded from the database).
    pub fn append(&mut self, entry: GameTransaction) {
        self.entries.push(entry);
    }

    /// Validate and append a ledger entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record(&mut self, params: RecordParams) -> Result<&GameTransaction, LedgerError> {
        let entry = build_entry(params)?;
        self.entries.push(entry);

        self.entries.last().ok_or(LedgerError::InternalError(
            "failed to retrieve entry after append",
        ))
    }

    /// Record the proceeds of a sale.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_sale(
        &mut self,
        player_id: PlayerId,
        tokens: u64,
        sale_id: SaleId,
        at: DateTime<Utc>,
    ) -> Result<&GameTransaction, LedgerError> {
        self.record(RecordParams {
            player_id,
            transaction_type: TransactionType::PlantSale,
            amount: to_credit(tokens)?,
            description: format!("Sold harvest for {tokens} tokens"),
            reference_id: Some(sale_id.into_inner()),
            created_at: at,
        })
    }

    /// Record a direct token grant or purchase.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_purchase(
        &mut self,
        player_id: PlayerId,
        tokens: u64,
        description: String,
        at: DateTime<Utc>,
    ) -> Result<&GameTransaction, LedgerError> {
        self.record(RecordParams {
            player_id,
            transaction_type: TransactionType::TokenPurchase,
            amount: to_credit(tokens)?,
            description,
            reference_id: None,
            created_at: at,
        })
    }

    /// Record the cost of a seed. `tokens` is the price; the stored amount
    /// is negative.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_seed_purchase(
        &mut self,
        player_id: PlayerId,
        tokens: u64,
        strain_id: Option<StrainId>,
        at: DateTime<Utc>,
    ) -> Result<&GameTransaction, LedgerError> {
        self.record(RecordParams {
            player_id,
            transaction_type: TransactionType::SeedPurchase,
            amount: to_credit(tokens)?.saturating_neg(),
            description: format!("Purchased seed for {tokens} tokens"),
            reference_id: strain_id.map(StrainId::into_inner),
            created_at: at,
        })
    }

    /// Record an achievement's token reward.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_achievement_reward(
        &mut self,
        player_id: PlayerId,
        tokens: u64,
        achievement_id: AchievementId,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<&GameTransaction, LedgerError> {
        self.record(RecordParams {
            player_id,
            transaction_type: TransactionType::AchievementReward,
            amount: to_credit(tokens)?,
            description: format!("Achievement unlocked: {name}"),
            reference_id: Some(achievement_id.into_inner()),
            created_at: at,
        })
    }

    /// Record a level-up bonus.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_level_up_bonus(
        &mut self,
        player_id: PlayerId,
        tokens: u64,
        new_level: u32,
        at: DateTime<Utc>,
    ) -> Result<&GameTransaction, LedgerError> {
        self.record(RecordParams {
            player_id,
            transaction_type: TransactionType::LevelUpBonus,
            amount: to_credit(tokens)?,
            description: format!("Reached level {new_level}"),
            reference_id: None,
            created_at: at,
        })
    }

    /// Return all entries, in insertion order.
    pub fn all_entries(&self) -> &[GameTransaction] {
        &self.entries
    }

    /// Return the entries appended after the first `cursor` entries.
    pub fn entries_since(&self, cursor: usize) -> &[GameTransaction] {
        self.entries.get(cursor..).unwrap_or_default()
    }

    /// Return all entries for one player, in insertion order.
    pub fn entries_for_player(&self, player_id: PlayerId) -> Vec<&GameTransaction> {
        self.entries
            .iter()
            .filter(|e| e.player_id == player_id)
            .collect()
    }

    /// Sum of a player's `plant_sale` and `token_purchase` amounts.
    ///
    /// This is the aggregate behind `tokens_earned` achievements. Level-up
    /// bonuses and achievement rewards are deliberately excluded so that a
    /// reward cannot pay for itself.
    pub fn tokens_earned(&self, player_id: PlayerId) -> i64 {
        self.entries
            .iter()
            .filter(|e| e.player_id == player_id && e.transaction_type.counts_as_earned())
            .fold(0_i64, |acc, e| acc.saturating_add(e.amount))
    }
}

/// Build a validated entry from record parameters.
fn build_entry(params: RecordParams) -> Result<GameTransaction, LedgerError> {
    let mut builder =
        TransactionBuilder::new(params.player_id, params.transaction_type, params.created_at)
            .amount(params.amount)
            .description(params.description);

    if let Some(reference) = params.reference_id {
        builder = builder.reference_id(reference);
    }

    builder.build()
}

/// Convert an unsigned token count to a signed ledger amount.
fn to_credit(tokens: u64) -> Result<i64, LedgerError> {
    i64::try_from(tokens).map_err(|_overflow| LedgerError::AmountOutOfRange(tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ledger_is_empty() {
        let ledger = Ledger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn seed_purchase_is_stored_negative() {
        let mut ledger = Ledger::new();
        let player = PlayerId::new();
        let strain = StrainId::new();
        let amount = ledger
            .record_seed_purchase(player, 30, Some(strain), Utc::now())
            .map(|e| e.amount);
        assert_eq!(amount.ok(), Some(-30));
        assert_eq!(ledger.entries_for_player(player).len(), 1);
    }

    #[test]
    fn tokens_earned_counts_only_sales_and_purchases() {
        let mut ledger = Ledger::new();
        let player = PlayerId::new();
        let now = Utc::now();

        assert!(ledger.record_sale(player, 100, SaleId::new(), now).is_ok());
        assert!(ledger.record_purchase(player, 250, "Grower Pack".to_owned(), now).is_ok());
        assert!(ledger.record_level_up_bonus(player, 50, 2, now).is_ok());
        assert!(
            ledger
                .record_achievement_reward(player, 75, AchievementId::new(), "First Sale", now)
                .is_ok()
        );
        assert!(ledger.record_seed_purchase(player, 20, None, now).is_ok());

        assert_eq!(ledger.tokens_earned(player), 350);
        let net: i64 = ledger.entries_for_player(player).iter().map(|e| e.amount).sum();
        assert_eq!(net, 455);
    }

    #[test]
    fn aggregates_are_per_player() {
        let mut ledger = Ledger::new();
        let alice = PlayerId::new();
        let bob = PlayerId::new();
        let now = Utc::now();

        assert!(ledger.record_sale(alice, 10, SaleId::new(), now).is_ok());
        assert!(ledger.record_sale(bob, 99, SaleId::new(), now).is_ok());

        assert_eq!(ledger.tokens_earned(alice), 10);
        assert_eq!(ledger.entries_for_player(bob).len(), 1);
    }

    #[test]
    fn zero_token_sale_rejected_and_not_appended() {
        let mut ledger = Ledger::new();
        let result = ledger.record_sale(PlayerId::new(), 0, SaleId::new(), Utc::now());
        assert!(matches!(result, Err(LedgerError::ZeroAmount)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn entries_since_returns_tail() {
        let mut ledger = Ledger::new();
        let player = PlayerId::new();
        let now = Utc::now();
        assert!(ledger.record_purchase(player, 1, "a".to_owned(), now).is_ok());
        assert!(ledger.record_purchase(player, 2, "b".to_owned(), now).is_ok());
        assert!(ledger.record_purchase(player, 3, "c".to_owned(), now).is_ok());

        let tail: Vec<i64> = ledger.entries_since(1).iter().map(|e| e.amount).collect();
        assert_eq!(tail, vec![2, 3]);
        assert!(ledger.entries_since(3).is_empty());
        assert!(ledger.entries_since(10).is_empty());
    }
}
