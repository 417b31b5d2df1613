//! Identifiers used throughout MarketSettle.
//!
//! Record ids (`TransactionId`, `AuctionId`, `DisputeId`, `BidId`) are drawn
//! from the host's monotonic sequence counter, so they are unique across
//! every store and sort in creation order. `Address` is the raw ed25519
//! public key of an account.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// An account on the host ledger: the raw ed25519 public key (32 bytes).
///
/// Serialized as a lowercase hex string so it can key JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Address(pub [u8; 32]);

impl Address {
    #[must_use]
    pub fn from_pubkey(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a well-known address from a domain label (used for the
    /// contract's own custody account).
    #[must_use]
    pub fn derive(label: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"marketsettle:address:v1:");
        hasher.update(label);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let raw = hex::decode(&text).map_err(de::Error::custom)?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| de::Error::custom("address must be 32 bytes"))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct:{}", hex::encode(&self.0[..8]))
    }
}

/// Deterministic addresses for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    #[must_use]
    pub fn from_seed(seed: u8) -> Self {
        Self([seed; 32])
    }

    #[must_use]
    pub fn random() -> Self {
        Self(rand::random::<[u8; 32]>())
    }
}

/// A random commit-reveal salt for tests.
#[cfg(any(test, feature = "test-helpers"))]
#[must_use]
pub fn random_salt() -> [u8; 32] {
    rand::random::<[u8; 32]>()
}

// ---------------------------------------------------------------------------
// Record ids
// ---------------------------------------------------------------------------

macro_rules! sequence_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

sequence_id!(
    /// Id of a sale, trade, bundle or auction settlement record.
    TransactionId,
    "tx"
);
sequence_id!(
    /// Id of an auction record (bids, pricing, timing).
    AuctionId,
    "auction"
);
sequence_id!(
    /// Id of a dispute opened against a transaction.
    DisputeId,
    "dispute"
);
sequence_id!(
    /// Id of a single bid in an auction's bid index.
    BidId,
    "bid"
);

// ---------------------------------------------------------------------------
// TokenId
// ---------------------------------------------------------------------------

/// An issued token: the issuing collection plus a serial within it.
///
/// Non-fungible items are issued tokens held in amounts of exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TokenId {
    pub collection: Address,
    pub serial: u64,
}

impl TokenId {
    #[must_use]
    pub fn new(collection: Address, serial: u64) -> Self {
        Self { collection, serial }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.collection.short(), self.serial)
    }
}

// ---------------------------------------------------------------------------
// ReceiptId
// ---------------------------------------------------------------------------

/// Id of a settlement receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ReceiptId(pub Uuid);

impl ReceiptId {
    /// Deterministic receipt id from the transaction, the host sequence at
    /// settlement, and the outcome tag.
    ///
    /// Replaying the same invocation against the same state always yields
    /// the same receipt id.
    #[must_use]
    pub fn deterministic(transaction: TransactionId, sequence: u64, outcome: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"marketsettle:receipt:v1:");
        hasher.update(transaction.0.to_le_bytes());
        hasher.update(sequence.to_le_bytes());
        hasher.update(outcome.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash[..16]);
        Self(Uuid::from_bytes(bytes))
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rcpt:{}", self.0)
    }
}
