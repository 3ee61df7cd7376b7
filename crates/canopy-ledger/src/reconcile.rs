//! Balance audit for the token ledger.
//!
//! Every player starts with the same opening balance and every change to
//! `Player::tokens` is supposed to be mirrored by one ledger entry. For each
//! player the audit therefore checks:
//!
//! ```text
//! opening_balance + sum(ledger amounts for player) == live balance
//! ```
//!
//! Ledger appends are best-effort (a failed append is logged and the
//! balance mutation stands), so a mismatch is an expected, reportable
//! condition rather than a hard error.

use std::collections::BTreeMap;

use canopy_types::{GameTransaction, PlayerId};

/// A set of players whose live balance disagrees with the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceAnomaly {
    /// Per player: `(expected from ledger, actual live balance)`.
    pub mismatches: BTreeMap<PlayerId, (i64, i64)>,
    /// Summary suitable for an `error!` log line.
    pub message: String,
}

/// The outcome of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileResult {
    /// Every audited player matches the ledger.
    Balanced,
    /// At least one player is out of balance.
    Anomaly(BalanceAnomaly),
}

impl ReconcileResult {
    /// Whether the audit found no mismatches.
    pub const fn is_balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }
}

/// Audit live balances against the ledger.
///
/// `live_balances` holds every player to audit; ledger entries for players
/// not in the map are ignored. Players with no entries are expected to hold
/// exactly `opening_balance`.
pub fn reconcile_balances(
    entries: &[GameTransaction],
    opening_balance: u64,
    live_balances: &BTreeMap<PlayerId, u64>,
) -> ReconcileResult {
    let opening = i64::try_from(opening_balance).unwrap_or(i64::MAX);

    let mut expected: BTreeMap<PlayerId, i64> = live_balances
        .keys()
        .map(|player| (*player, opening))
        .collect();

    for entry in entries {
        if let Some(total) = expected.get_mut(&entry.player_id) {
            *total = total.saturating_add(entry.amount);
        }
    }

    let mismatches: BTreeMap<PlayerId, (i64, i64)> = live_balances
        .iter()
        .filter_map(|(player, live)| {
            let actual = i64::try_from(*live).unwrap_or(i64::MAX);
            let want = expected.get(player).copied().unwrap_or(opening);
            (want != actual).then_some((*player, (want, actual)))
        })
        .collect();

    if mismatches.is_empty() {
        ReconcileResult::Balanced
    } else {
        let count = mismatches.len();
        ReconcileResult::Anomaly(BalanceAnomaly {
            mismatches,
            message: format!("BALANCE_ANOMALY: {count} player(s) disagree with the ledger"),
        })
    }
}
