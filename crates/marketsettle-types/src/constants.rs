//! System-wide constants for the MarketSettle engine.

/// Basis-point denominator (10 000 bps = 100 %).
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Default platform fee (2.5 %).
pub const DEFAULT_BASE_FEE_BPS: u32 = 250;

/// Maximum lifetime of a sale, trade or bundle listing (30 days).
pub const DEFAULT_MAX_TRANSACTION_DURATION: u64 = 30 * 86_400;

/// Shortest auction accepted (1 minute).
pub const DEFAULT_MIN_AUCTION_DURATION: u64 = 60;

/// Longest auction accepted (7 days).
pub const DEFAULT_MAX_AUCTION_DURATION: u64 = 7 * 86_400;

/// Time allowed after `end_time` for committed bids to be revealed (1 hour).
pub const DEFAULT_REVEAL_PERIOD: u64 = 3_600;

/// Anti-sniping window: bids this close to `end_time` extend the auction.
pub const DEFAULT_EXTENSION_WINDOW: u64 = 300;

/// Minimum arbiter votes before a dispute can resolve early.
pub const DEFAULT_ARBITRATION_QUORUM: u32 = 3;

/// Time an open dispute waits for quorum before the default verdict applies (7 days).
pub const DEFAULT_RESOLUTION_PERIOD: u64 = 7 * 86_400;

/// Window after opening during which evidence may be attached (7 days).
pub const DEFAULT_EVIDENCE_PERIOD: u64 = 7 * 86_400;

/// Longest evidence URI accepted.
pub const MAX_EVIDENCE_URI_LEN: usize = 512;

/// Evidence entries kept per dispute.
pub const MAX_EVIDENCE_PER_DISPUTE: usize = 16;

/// Share of fungible escrow sent to the seller side on a split verdict.
pub const DEFAULT_SPLIT_SELLER_BPS: u32 = 5_000;

/// Maximum number of items in one bundle or one side of a trade.
pub const MAX_ITEMS_PER_LISTING: usize = 32;

/// Label the contract's custody address is derived from.
pub const CONTRACT_ADDRESS_LABEL: &[u8] = b"marketsettle:contract";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
