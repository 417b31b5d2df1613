//! Typed keys of the persistent key-value store.
//!
//! The durable layout is three record stores (transactions, auctions,
//! disputes), their secondary indices, the singleton configuration, the
//! treasury counter, and per-id reentrancy flags.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AuctionId, BidId, DisputeId, TransactionId};

/// The id a reentrancy flag guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum LockKey {
    Transaction(TransactionId),
    Auction(AuctionId),
    Dispute(DisputeId),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transaction(id) => write!(f, "{id}"),
            Self::Auction(id) => write!(f, "{id}"),
            Self::Dispute(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum StorageKey {
    Config,
    Treasury,
    Transaction(TransactionId),
    Auction(AuctionId),
    Dispute(DisputeId),
    Bid(BidId),
    /// Auction id → ordered bid ids.
    AuctionBids(AuctionId),
    /// Transaction id → its dispute, if one was ever opened.
    TransactionDispute(TransactionId),
    /// Reentrancy flag.
    Lock(LockKey),
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Treasury => write!(f, "treasury"),
            Self::Transaction(id) => write!(f, "record/{id}"),
            Self::Auction(id) => write!(f, "record/{id}"),
            Self::Dispute(id) => write!(f, "record/{id}"),
            Self::Bid(id) => write!(f, "record/{id}"),
            Self::AuctionBids(id) => write!(f, "index/bids/{id}"),
            Self::TransactionDispute(id) => write!(f, "index/dispute/{id}"),
            Self::Lock(key) => write!(f, "lock/{key}"),
        }
    }
}
