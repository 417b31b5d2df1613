//! Auction and bid records.
//!
//! ## State Machine
//!
//! ```text
//!   ┌──────┐ end_auction / dutch fill ┌─────────────┐
//!   │ OPEN ├─────────────────────────▶│ ENDED_SOLD  │
//!   └─┬──┬─┘                          └─────────────┘
//!     │  │ end_auction, no qualifying bid
//!     │  └───────────────────────────▶ ENDED_UNSOLD
//!     │ cancel_auction / emergency withdrawal
//!     └──────────────────────────────▶ CANCELLED
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Address, AssetKind, AuctionId, BidId, ListedItem, StateError, TransactionId};

/// Pricing rule of an auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionKind {
    /// Ascending bids; each must beat the leader by `min_increment`.
    English { min_increment: u64 },
    /// Descending price: `start_price` drops by `drop_per_period` every
    /// `period` seconds, never below the reserve.
    Dutch {
        start_price: u64,
        drop_per_period: u64,
        period: u64,
    },
}

impl AuctionKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::English { .. } => "english",
            Self::Dutch { .. } => "dutch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionState {
    Open,
    EndedSold,
    EndedUnsold,
    Cancelled,
}

impl AuctionState {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::EndedSold | Self::EndedUnsold | Self::Cancelled)
        )
    }
}

impl fmt::Display for AuctionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::EndedSold => write!(f, "ENDED_SOLD"),
            Self::EndedUnsold => write!(f, "ENDED_UNSOLD"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// An auction over one listed item. Its escrow lives on the linked
/// [`crate::Transaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,
    pub transaction: TransactionId,
    pub seller: Address,
    pub item: ListedItem,
    pub kind: AuctionKind,
    pub payment_kind: AssetKind,
    pub reserve: u64,
    pub start_time: u64,
    /// Moves later when a bid lands inside the extension window.
    pub end_time: u64,
    /// Snapshot of the configured reveal period at creation.
    pub reveal_period: u64,
    /// Snapshot of the configured extension window at creation.
    pub extension_window: u64,
    pub state: AuctionState,
    /// Current leading bid, if any.
    pub leader: Option<BidId>,
    /// Committed bids not yet revealed.
    pub unrevealed: u32,
    /// Every bid or commitment ever placed.
    pub bid_count: u32,
}

impl Auction {
    /// Last moment at which a commitment may be revealed.
    #[must_use]
    pub fn reveal_deadline(&self) -> u64 {
        self.end_time.saturating_add(self.reveal_period)
    }

    #[must_use]
    pub fn is_dutch(&self) -> bool {
        matches!(self.kind, AuctionKind::Dutch { .. })
    }

    /// Require `Open`.
    pub fn expect_open(&self) -> Result<(), StateError> {
        if self.state != AuctionState::Open {
            return Err(StateError::WrongAuctionState {
                auction: self.id,
                expected: "OPEN",
                actual: self.state.to_string(),
            });
        }
        Ok(())
    }

    pub fn transition(&mut self, target: AuctionState) -> Result<(), StateError> {
        if !self.state.can_transition_to(target) {
            return Err(StateError::WrongAuctionState {
                auction: self.id,
                expected: "OPEN",
                actual: self.state.to_string(),
            });
        }
        self.state = target;
        Ok(())
    }
}

/// A bid commitment: a SHA-256 digest binding amount, salt, bidder and auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "commit:{}", hex::encode(&self.0[..8]))
    }
}

/// Where a bid's escrow stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidStatus {
    /// Funds in escrow (leading bid or unrevealed commitment).
    Active,
    /// Escrow returned: outbid, losing reveal, or auction closed without it.
    Refunded,
    /// Settled as the winning bid.
    Won,
    /// Commitment never revealed; deposit kept by the platform.
    Forfeited,
}

/// One bid in an auction's bid index.
///
/// Exactly one of `amount` and `commitment` is set when the bid is placed;
/// a committed bid gains an `amount` only through a matching reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub auction: AuctionId,
    pub bidder: Address,
    pub amount: Option<u64>,
    pub commitment: Option<Commitment>,
    /// Escrowed funds backing the bid.
    pub deposit: u64,
    pub revealed: bool,
    pub placed_at: u64,
    pub status: BidStatus,
}

impl Bid {
    #[must_use]
    pub fn is_pending_reveal(&self) -> bool {
        self.commitment.is_some() && !self.revealed && self.status == BidStatus::Active
    }

    /// Does this bid beat `other`? Higher amount wins; equal amounts go to
    /// the earlier `placed_at`, then the earlier id.
    #[must_use]
    pub fn outranks(&self, other: &Self) -> bool {
        let mine = self.amount.unwrap_or(0);
        let theirs = other.amount.unwrap_or(0);
        mine > theirs
            || (mine == theirs && (self.placed_at, self.id) < (other.placed_at, other.id))
    }
}
