//! Error taxonomy for the MarketSettle engine.
//!
//! All errors use the `MS_ERR_` prefix convention for easy grepping in logs.
//! Codes are grouped by category:
//! - 1xx: Authorization errors
//! - 2xx: State errors
//! - 3xx: Payment errors
//! - 4xx: Math errors
//! - 5xx: Security errors
//! - 6xx: Not-found errors
//! - 7xx: Validation errors
//! - 9xx: Storage / internal errors
//!
//! Every error aborts the whole invocation; the host discards all writes.

use thiserror::Error;

use crate::{Address, AssetKind, AuctionId, BidId, DisputeId, TransactionId};

/// Wrong caller for a privileged or party-restricted action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("MS_ERR_100: {0} did not authorize this invocation")]
    MissingSignature(Address),

    #[error("MS_ERR_101: {caller} is not the marketplace administrator")]
    NotAdmin { caller: Address },

    #[error("MS_ERR_102: {caller} is not a party to {transaction}")]
    NotParty {
        caller: Address,
        transaction: TransactionId,
    },

    #[error("MS_ERR_103: {caller} is not an authorized arbiter for {dispute}")]
    NotArbiter { caller: Address, dispute: DisputeId },

    #[error("MS_ERR_104: only the seller may do this before expiry")]
    NotSeller { caller: Address },

    #[error("MS_ERR_105: seller and buyer are the same account")]
    SelfDealing,

    #[error("MS_ERR_106: invalid caller signature")]
    InvalidSignature,

    #[error("MS_ERR_107: {caller} may not submit evidence on {dispute}")]
    NotEvidenceSubmitter { caller: Address, dispute: DisputeId },
}

/// Operation invalid for the current lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("MS_ERR_200: marketplace already initialized")]
    AlreadyInitialized,

    #[error("MS_ERR_201: marketplace not initialized")]
    NotInitialized,

    #[error("MS_ERR_202: {transaction} is {actual}, expected {expected}")]
    WrongTransactionState {
        transaction: TransactionId,
        expected: &'static str,
        actual: String,
    },

    #[error("MS_ERR_203: {0} has expired")]
    Expired(TransactionId),

    #[error("MS_ERR_204: {0} has not expired yet")]
    NotExpired(TransactionId),

    #[error("MS_ERR_205: {auction} is {actual}, expected {expected}")]
    WrongAuctionState {
        auction: AuctionId,
        expected: &'static str,
        actual: String,
    },

    #[error("MS_ERR_206: bidding on {0} has closed")]
    BiddingClosed(AuctionId),

    #[error("MS_ERR_207: {0} cannot end yet")]
    AuctionStillRunning(AuctionId),

    #[error("MS_ERR_208: {0} has bids or commitments and cannot be cancelled")]
    AuctionHasBids(AuctionId),

    #[error("MS_ERR_209: {0} is under dispute; settlement paused")]
    Disputed(TransactionId),

    #[error("MS_ERR_210: {0} already has a dispute")]
    DisputeExists(TransactionId),

    #[error("MS_ERR_211: {dispute} is {actual}, expected an open dispute")]
    DisputeClosed { dispute: DisputeId, actual: String },

    #[error("MS_ERR_212: {0} has neither quorum nor a passed deadline")]
    DisputeNotReady(DisputeId),

    #[error("MS_ERR_213: reveal window for {0} is closed")]
    RevealClosed(AuctionId),

    #[error("MS_ERR_214: {bidder} has no unrevealed commitment on {auction}")]
    NoCommitment { auction: AuctionId, bidder: Address },

    #[error("MS_ERR_215: {0} does not accept committed bids")]
    CommitmentsNotAccepted(AuctionId),

    #[error("MS_ERR_216: emergency withdrawal is disabled")]
    EmergencyWithdrawalDisabled,

    #[error("MS_ERR_217: {0} is not a {1} transaction")]
    WrongVariant(TransactionId, &'static str),

    #[error("MS_ERR_218: evidence window for {0} is closed")]
    EvidenceClosed(DisputeId),
}

/// Amount mismatch or insufficient funds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("MS_ERR_300: payment must be exactly {expected}, got {offered}")]
    AmountMismatch { expected: u64, offered: u64 },

    #[error("MS_ERR_301: payment asset does not match the listing")]
    AssetMismatch,

    #[error("MS_ERR_302: insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("MS_ERR_303: bid {offered} below minimum {minimum}")]
    BidTooLow { minimum: u64, offered: u64 },

    #[error("MS_ERR_304: revealed amount {amount} exceeds deposit {deposit}")]
    DepositTooSmall { amount: u64, deposit: u64 },

    #[error("MS_ERR_305: platform fee balance {available} below withdrawal {requested}")]
    InsufficientFeeBalance { requested: u64, available: u64 },
}

/// Checked-arithmetic failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("MS_ERR_400: arithmetic overflow")]
    Overflow,

    #[error("MS_ERR_401: arithmetic underflow")]
    Underflow,

    #[error("MS_ERR_402: division by zero")]
    DivisionByZero,
}

/// Reentrancy and commit-reveal violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("MS_ERR_500: reentrant call on {0}")]
    Reentrant(String),

    #[error("MS_ERR_501: reveal does not match the stored commitment")]
    InvalidReveal,

    #[error("MS_ERR_502: {bidder} already holds a commitment on {auction}")]
    CommitmentExists { auction: AuctionId, bidder: Address },

    #[error("MS_ERR_503: record write without holding the lock for {0}")]
    LockNotHeld(String),
}

/// Unknown ids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("MS_ERR_600: transaction not found: {0}")]
    Transaction(TransactionId),

    #[error("MS_ERR_601: auction not found: {0}")]
    Auction(AuctionId),

    #[error("MS_ERR_602: dispute not found: {0}")]
    Dispute(DisputeId),

    #[error("MS_ERR_603: bid not found: {0}")]
    Bid(BidId),
}

/// Malformed inputs, rejected before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("MS_ERR_700: zero-amount assets cannot be settled")]
    ZeroAmount,

    #[error("MS_ERR_701: royalty shares sum to {0} bps, expected 10000")]
    SharesNotWhole(u64),

    #[error("MS_ERR_702: basis points {0} exceed 10000")]
    BpsOutOfRange(u32),

    #[error("MS_ERR_703: duration {duration}s outside [{min}, {max}]")]
    DurationOutOfRange { duration: u64, min: u64, max: u64 },

    #[error("MS_ERR_704: invalid configuration: {0}")]
    Config(String),

    #[error("MS_ERR_705: a listing needs at least one item")]
    EmptyListing,

    #[error("MS_ERR_706: the same token is listed twice")]
    DuplicateItem,

    #[error("MS_ERR_707: invalid auction parameters: {0}")]
    AuctionParams(String),

    #[error("MS_ERR_708: listed items must be single issued tokens")]
    FractionalItem,

    #[error("MS_ERR_709: invalid evidence: {0}")]
    Evidence(String),
}

/// Persisted-record decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("MS_ERR_900: corrupt record under {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("MS_ERR_901: cannot encode record: {0}")]
    Encode(String),

    /// Circulating balances drifted from issuance. Never expected.
    #[error(
        "MS_ERR_902: supply invariant violated for {kind}: circulating {actual}, minted {expected}"
    )]
    SupplyInvariant {
        kind: AssetKind,
        expected: u128,
        actual: u128,
    },
}

/// Central error enum: one transparent variant per taxonomy category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Math(#[from] MathError),
    #[error(transparent)]
    Security(#[from] SecurityError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl MarketError {
    /// Short category name, as used in logs and events.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Authorization(_) => "authorization",
            Self::State(_) => "state",
            Self::Payment(_) => "payment",
            Self::Math(_) => "math",
            Self::Security(_) => "security",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Storage(_) => "storage",
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, MarketError>;
