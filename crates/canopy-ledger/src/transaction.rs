//! Transaction builder and validation for the token ledger.
//!
//! Provides a [`TransactionBuilder`] that enforces the ledger's sign
//! convention: spends are negative, every other entry type is a positive
//! credit, and no entry may be zero.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use canopy_types::{GameTransaction, PlayerId, TransactionId, TransactionType};

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Transaction builder
// ---------------------------------------------------------------------------

/// Builder for constructing validated [`GameTransaction`] values.
///
/// # Examples
///
/// ```
/// use canopy_ledger::TransactionBuilder;
/// use canopy_types::{PlayerId, TransactionType};
/// use chrono::Utc;
///
/// let entry = TransactionBuilder::new(PlayerId::new(), TransactionType::PlantSale, Utc::now())
///     .amount(150)
///     .description("Sold 10.0g".to_owned())
///     .build();
///
/// assert!(entry.is_ok());
/// ```
#[derive(Debug)]
pub struct TransactionBuilder {
    player_id: PlayerId,
    transaction_type: TransactionType,
    created_at: DateTime<Utc>,
    amount: Option<i64>,
    description: Option<String>,
    reference_id: Option<Uuid>,
}

impl TransactionBuilder {
    /// Start building a ledger entry for the given player and type, stamped
    /// with `created_at`.
    pub const fn new(
        player_id: PlayerId,
        transaction_type: TransactionType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            player_id,
            transaction_type,
            created_at,
            amount: None,
            description: None,
            reference_id: None,
        }
    }

    /// Set the signed token delta.
    #[must_use]
    pub const fn amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Set the human-readable description.
    #[must_use]
    pub fn description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    /// Link the entry to a related row (sale, strain, achievement).
    #[must_use]
    pub const fn reference_id(mut self, id: Uuid) -> Self {
        self.reference_id = Some(id);
        self
    }

    /// Validate inputs and produce a [`GameTransaction`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingField`] if amount or description is unset.
    /// Returns [`LedgerError::ZeroAmount`] if the amount is zero.
    /// Returns [`LedgerError::SignMismatch`] if the sign disagrees with the
    /// entry type.
    pub fn build(self) -> Result<GameTransaction, LedgerError> {
        let amount = self.amount.ok_or(LedgerError::MissingField("amount"))?;
        let description = self
            .description
            .ok_or(LedgerError::MissingField("description"))?;

        validate_amount(self.transaction_type, amount)?;

        Ok(GameTransaction {
            id: TransactionId::new(),
            player_id: self.player_id,
            transaction_type: self.transaction_type,
            amount,
            description,
            reference_id: self.reference_id,
            created_at: self.created_at,
        })
    }
}

/// Check the amount against the sign convention for its entry type.
fn validate_amount(transaction_type: TransactionType, amount: i64) -> Result<(), LedgerError> {
    if amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }
    if transaction_type.is_debit() != amount.is_negative() {
        return Err(LedgerError::SignMismatch {
            transaction_type,
            amount,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_valid_entry() {
        let player = PlayerId::new();
        let reference = Uuid::now_v7();
        let now = Utc::now();
        let result = TransactionBuilder::new(player, TransactionType::PlantSale, now)
            .amount(42)
            .description("Sold harvest".to_owned())
            .reference_id(reference)
            .build();

        assert!(result.is_ok());
        if let Ok(entry) = result {
            assert_eq!(entry.player_id, player);
            assert_eq!(entry.transaction_type, TransactionType::PlantSale);
            assert_eq!(entry.amount, 42);
            assert_eq!(entry.reference_id, Some(reference));
            assert_eq!(entry.created_at, now);
        }
    }

    #[test]
    fn zero_amount_rejected() {
        let result = TransactionBuilder::new(PlayerId::new(), TransactionType::TokenPurchase, Utc::now())
            .amount(0)
            .description("nothing".to_owned())
            .build();
        assert!(matches!(result, Err(LedgerError::ZeroAmount)));
    }

    #[test]
    fn negative_credit_rejected() {
        let result = TransactionBuilder::new(PlayerId::new(), TransactionType::PlantSale, Utc::now())
            .amount(-5)
            .description("bad".to_owned())
            .build();
        assert!(matches!(result, Err(LedgerError::SignMismatch { .. })));
    }

    #[test]
    fn positive_spend_rejected() {
        let result = TransactionBuilder::new(PlayerId::new(), TransactionType::SeedPurchase, Utc::now())
            .amount(5)
            .description("bad".to_owned())
            .build();
        assert!(matches!(result, Err(LedgerError::SignMismatch { .. })));
    }

    #[test]
    fn missing_description_rejected() {
        let result = TransactionBuilder::new(PlayerId::new(), TransactionType::LevelUpBonus, Utc::now())
            .amount(50)
            .build();
        assert!(matches!(result, Err(LedgerError::MissingField("description"))));
    }

    #[test]
    fn reference_id_is_optional() {
        let result = TransactionBuilder::new(PlayerId::new(), TransactionType::TokenPurchase, Utc::now())
            .amount(250)
            .description("Grower Pack".to_owned())
            .build();
        assert!(result.is_ok_and(|e| e.reference_id.is_none()));
    }
}
