//! # marketsettle-engine
//!
//! Settlement core of the **MarketSettle** NFT marketplace.
//!
//! - [`Marketplace`]: the public API; every mutating call is one
//!   all-or-nothing host invocation
//! - [`swap`]: fixed-price sales, bundles and two-sided trades
//! - [`auction`]: English auctions (plaintext or commit-reveal bids, with
//!   anti-sniping) and Dutch auctions
//! - [`dispute`]: arbitration over contested escrow, evidence and the
//!   administrator override
//! - [`admin`]: configuration writes, fee withdrawal, emergency withdrawal
//! - [`escrow`], [`settlement`], [`fees`], [`royalty`]: custody and payout
//! - [`security`]: per-id reentrancy guard and bid commitments
//! - [`storage`]: typed record stores over the host's key-value state
//!
//! ## Transaction lifecycle
//!
//! ```text
//! Created ──▶ Accepted ──▶ Executed
//!    │  │         │
//!    │  │         ├──▶ Expired / Withdrawn
//!    │  ├──▶ Cancelled / Expired / Withdrawn
//!    │  ▼         ▼
//!    └─▶ Disputed ──▶ Released / Refunded / Split
//! ```
//!
//! Every terminal transaction carries exactly one [`SettlementRecord`].
//!
//! [`SettlementRecord`]: marketsettle_types::SettlementRecord

pub mod admin;
pub mod auction;
pub mod dispute;
pub mod escrow;
pub mod fees;
pub mod marketplace;
pub mod royalty;
pub mod security;
pub mod settlement;
pub mod storage;
pub mod swap;

pub use auction::{AuctionParams, dutch_price};
pub use escrow::EscrowManager;
pub use marketplace::Marketplace;
pub use security::{ReentrancyGuard, commitment, verify_reveal};
pub use storage::LockToken;
pub use swap::{Listing, TradeTerms};
