//! # marketsettle-types
//!
//! Shared types, errors, and configuration for the **MarketSettle**
//! settlement engine.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`Address`], [`TransactionId`], [`AuctionId`], [`DisputeId`], [`BidId`],
//!   [`TokenId`], [`ReceiptId`]
//! - **Asset model**: [`Asset`], [`AssetKind`]
//! - **Transaction model**: [`Transaction`], [`TransactionKind`], [`TransactionState`],
//!   [`EscrowHolding`]
//! - **Auction model**: [`Auction`], [`AuctionKind`], [`AuctionState`], [`Bid`], [`Commitment`]
//! - **Dispute model**: [`Dispute`], [`DisputeState`], [`Verdict`], [`ReasonCode`], [`Evidence`]
//! - **Royalties**: [`RoyaltyDistribution`], [`Distribution`]
//! - **Receipts and events**: [`SettlementRecord`], [`Transfer`], [`Event`], [`EventKind`]
//! - **Configuration**: [`MarketConfig`], [`FeeConfig`], [`AuctionConfig`], [`DisputeConfig`]
//! - **Storage keys**: [`StorageKey`], [`LockKey`]
//! - **Errors**: [`MarketError`] with `MS_ERR_` prefix codes
//! - **Utilities**: checked [`math`] and ledger-clock [`time`] helpers

pub mod asset;
pub mod auction;
pub mod config;
pub mod constants;
pub mod dispute;
pub mod error;
pub mod event;
pub mod ids;
pub mod keys;
pub mod math;
pub mod receipt;
pub mod royalty;
pub mod time;
pub mod transaction;

// Re-export all primary types at crate root for ergonomic imports:
//   use marketsettle_types::{Asset, Transaction, Bid, Dispute, ...};

pub use asset::*;
pub use auction::*;
pub use config::*;
pub use dispute::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use keys::*;
pub use receipt::*;
pub use royalty::*;
pub use transaction::*;

// Constants, math and time helpers are accessed through their modules
// (`marketsettle_types::math::bps_of`), not re-exported.
