//! Settlement receipts for the audit trail.
//!
//! Every transaction that reaches a terminal state carries exactly one
//! [`SettlementRecord`], listing each custody movement it performed.

use serde::{Deserialize, Serialize};

use crate::{Address, Asset, Distribution, ReceiptId, TransactionId, TransactionState};

/// Why an asset moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferPurpose {
    /// Item delivered to its new owner.
    Delivery,
    /// Seller proceeds.
    Proceeds,
    /// Creator royalty.
    Royalty,
    /// Platform fee, credited to the fee balance.
    PlatformFee,
    /// Escrow returned to its depositor.
    Refund,
    /// Share of fungible escrow on a split verdict.
    SplitShare,
    /// Unrevealed commitment deposit kept by the platform.
    Forfeit,
}

impl std::fmt::Display for TransferPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivery => write!(f, "DELIVERY"),
            Self::Proceeds => write!(f, "PROCEEDS"),
            Self::Royalty => write!(f, "ROYALTY"),
            Self::PlatformFee => write!(f, "PLATFORM_FEE"),
            Self::Refund => write!(f, "REFUND"),
            Self::SplitShare => write!(f, "SPLIT_SHARE"),
            Self::Forfeit => write!(f, "FORFEIT"),
        }
    }
}

/// One movement of value performed during settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub asset: Asset,
    pub purpose: TransferPurpose,
}

/// The unique settlement record of a terminal transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub receipt_id: ReceiptId,
    pub transaction: TransactionId,
    /// The terminal state reached.
    pub outcome: TransactionState,
    pub transfers: Vec<Transfer>,
    /// Present when a payment was split between seller, creator and platform.
    pub distribution: Option<Distribution>,
    pub settled_at: u64,
    /// Host sequence number at settlement.
    pub sequence: u64,
}

impl SettlementRecord {
    #[must_use]
    pub fn new(
        transaction: TransactionId,
        outcome: TransactionState,
        transfers: Vec<Transfer>,
        distribution: Option<Distribution>,
        settled_at: u64,
        sequence: u64,
    ) -> Self {
        Self {
            receipt_id: ReceiptId::deterministic(transaction, sequence, &outcome.to_string()),
            transaction,
            outcome,
            transfers,
            distribution,
            settled_at,
            sequence,
        }
    }

    /// Total moved to `to` in transfers of `purpose`.
    #[must_use]
    pub fn received(&self, to: &Address, purpose: TransferPurpose) -> u64 {
        self.transfers
            .iter()
            .filter(|t| t.to == *to && t.purpose == purpose)
            .map(|t| t.asset.amount)
            .fold(0u64, u64::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_id_is_derived_from_outcome() {
        let record = |state| SettlementRecord::new(TransactionId(1), state, vec![], None, 5, 9);
        let a = record(TransactionState::Executed);
        let b = record(TransactionState::Cancelled);
        assert_ne!(a.receipt_id, b.receipt_id);
        assert_eq!(
            a.receipt_id,
            ReceiptId::deterministic(TransactionId(1), 9, "EXECUTED")
        );
    }

    #[test]
    fn received_sums_by_purpose() {
        let seller = Address::from_seed(1);
        let buyer = Address::from_seed(2);
        let record = SettlementRecord::new(
            TransactionId(1),
            TransactionState::Executed,
            [
                (600, TransferPurpose::Proceeds),
                (300, TransferPurpose::Proceeds),
                (50, TransferPurpose::Royalty),
            ]
            .into_iter()
            .map(|(amount, purpose)| Transfer {
                from: buyer,
                to: seller,
                asset: Asset::native(amount),
                purpose,
            })
            .collect(),
            None,
            0,
            0,
        );
        assert_eq!(record.received(&seller, TransferPurpose::Proceeds), 900);
        assert_eq!(record.received(&seller, TransferPurpose::Royalty), 50);
    }
}
