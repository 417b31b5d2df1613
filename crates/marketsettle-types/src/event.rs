//! Structured events for off-chain indexing.
//!
//! Every mutating operation emits at least one [`Event`] through the host.
//! Events of an aborted invocation are discarded with the rest of its writes.

use serde::{Deserialize, Serialize};

use crate::{
    Address, Asset, AuctionId, BidId, Commitment, Distribution, DisputeId, ReasonCode,
    TransactionId, TransactionState, Verdict,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Initialized {
        admin: Address,
    },
    FeeConfigUpdated {
        admin: Address,
        base_fee_bps: u32,
    },
    AuctionConfigUpdated {
        admin: Address,
    },
    DisputeConfigUpdated {
        admin: Address,
        quorum: u32,
    },
    EmergencyWithdrawalToggled {
        admin: Address,
        enabled: bool,
    },
    SaleCreated {
        transaction: TransactionId,
        seller: Address,
        items: u32,
        price: Asset,
        expires_at: u64,
    },
    SaleExecuted {
        transaction: TransactionId,
        seller: Address,
        buyer: Address,
        distribution: Distribution,
    },
    TradeCreated {
        transaction: TransactionId,
        initiator: Address,
        counterparty: Address,
    },
    TradeAccepted {
        transaction: TransactionId,
        counterparty: Address,
    },
    TradeExecuted {
        transaction: TransactionId,
        initiator: Address,
        counterparty: Address,
    },
    TransactionClosed {
        transaction: TransactionId,
        caller: Address,
        state: TransactionState,
    },
    AuctionCreated {
        auction: AuctionId,
        transaction: TransactionId,
        seller: Address,
        reserve: u64,
        end_time: u64,
    },
    BidPlaced {
        auction: AuctionId,
        bid: BidId,
        bidder: Address,
        amount: u64,
    },
    BidCommitted {
        auction: AuctionId,
        bid: BidId,
        bidder: Address,
        commitment: Commitment,
        deposit: u64,
    },
    BidRevealed {
        auction: AuctionId,
        bid: BidId,
        bidder: Address,
        amount: u64,
        leading: bool,
    },
    BidRefunded {
        auction: AuctionId,
        bid: BidId,
        bidder: Address,
        amount: u64,
    },
    BidForfeited {
        auction: AuctionId,
        bid: BidId,
        bidder: Address,
        deposit: u64,
    },
    AuctionExtended {
        auction: AuctionId,
        end_time: u64,
    },
    AuctionEnded {
        auction: AuctionId,
        winner: Option<Address>,
        price: Option<u64>,
    },
    AuctionCancelled {
        auction: AuctionId,
        seller: Address,
    },
    DisputeOpened {
        dispute: DisputeId,
        transaction: TransactionId,
        initiator: Address,
        reason: ReasonCode,
    },
    DisputeVoted {
        dispute: DisputeId,
        arbiter: Address,
        verdict: Verdict,
    },
    DisputeResolved {
        dispute: DisputeId,
        transaction: TransactionId,
        verdict: Verdict,
    },
    EvidenceSubmitted {
        dispute: DisputeId,
        submitter: Address,
        index: u32,
    },
    DisputeForceResolved {
        dispute: DisputeId,
        admin: Address,
        verdict: Verdict,
    },
    PlatformFeesWithdrawn {
        admin: Address,
        amount: Asset,
    },
    EmergencyWithdrawal {
        admin: Address,
        transaction: TransactionId,
        holdings: u32,
    },
}

impl EventKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialized { .. } => "initialized",
            Self::FeeConfigUpdated { .. } => "fee_config_updated",
            Self::AuctionConfigUpdated { .. } => "auction_config_updated",
            Self::DisputeConfigUpdated { .. } => "dispute_config_updated",
            Self::EmergencyWithdrawalToggled { .. } => "emergency_withdrawal_toggled",
            Self::SaleCreated { .. } => "sale_created",
            Self::SaleExecuted { .. } => "sale_executed",
            Self::TradeCreated { .. } => "trade_created",
            Self::TradeAccepted { .. } => "trade_accepted",
            Self::TradeExecuted { .. } => "trade_executed",
            Self::TransactionClosed { .. } => "transaction_closed",
            Self::AuctionCreated { .. } => "auction_created",
            Self::BidPlaced { .. } => "bid_placed",
            Self::BidCommitted { .. } => "bid_committed",
            Self::BidRevealed { .. } => "bid_revealed",
            Self::BidRefunded { .. } => "bid_refunded",
            Self::BidForfeited { .. } => "bid_forfeited",
            Self::AuctionExtended { .. } => "auction_extended",
            Self::AuctionEnded { .. } => "auction_ended",
            Self::AuctionCancelled { .. } => "auction_cancelled",
            Self::DisputeOpened { .. } => "dispute_opened",
            Self::DisputeVoted { .. } => "dispute_voted",
            Self::DisputeResolved { .. } => "dispute_resolved",
            Self::EvidenceSubmitted { .. } => "evidence_submitted",
            Self::DisputeForceResolved { .. } => "dispute_force_resolved",
            Self::PlatformFeesWithdrawn { .. } => "platform_fees_withdrawn",
            Self::EmergencyWithdrawal { .. } => "emergency_withdrawal",
        }
    }
}

/// An event stamped with the ledger clock and sequence at emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub timestamp: u64,
    pub sequence: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_json_is_tagged_by_variant() {
        let event = Event {
            kind: EventKind::AuctionExtended {
                auction: AuctionId(3),
                end_time: 900,
            },
            timestamp: 600,
            sequence: 12,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("AuctionExtended"), "Got: {json}");
        assert_eq!(event.kind.name(), "auction_extended");
    }
}
