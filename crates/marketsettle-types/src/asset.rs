//! Asset model: the native ledger asset and issued tokens.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Address, TokenId, ValidationError};

/// What an [`Asset`] is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum AssetKind {
    /// The host ledger's native currency.
    Native,
    /// A token issued by a collection contract.
    Issued(TokenId),
}

impl AssetKind {
    #[must_use]
    pub fn token(collection: Address, serial: u64) -> Self {
        Self::Issued(TokenId::new(collection, serial))
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "NATIVE"),
            Self::Issued(token) => write!(f, "{token}"),
        }
    }
}

/// A quantity of one asset kind.
///
/// Non-fungible items are modelled as an issued token with `amount == 1`.
/// Zero-amount assets are never valid in a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub kind: AssetKind,
    pub amount: u64,
}

impl Asset {
    #[must_use]
    pub fn new(kind: AssetKind, amount: u64) -> Self {
        Self { kind, amount }
    }

    #[must_use]
    pub fn native(amount: u64) -> Self {
        Self::new(AssetKind::Native, amount)
    }

    /// A single non-fungible item.
    #[must_use]
    pub fn nft(token: TokenId) -> Self {
        Self::new(AssetKind::Issued(token), 1)
    }

    /// Reject zero amounts.
    ///
    /// # Errors
    /// [`ValidationError::ZeroAmount`] when `amount == 0`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount == 0 {
            return Err(ValidationError::ZeroAmount);
        }
        Ok(())
    }

    /// Validate an item listed for sale, trade, bundle or auction: it must
    /// be a single issued token.
    pub fn validate_item(&self) -> Result<(), ValidationError> {
        self.validate()?;
        if !self.is_non_fungible() {
            return Err(ValidationError::FractionalItem);
        }
        Ok(())
    }

    /// A single unit of an issued token.
    #[must_use]
    pub fn is_non_fungible(&self) -> bool {
        matches!(self.kind, AssetKind::Issued(_)) && self.amount == 1
    }

    #[must_use]
    pub fn same_kind(&self, other: &Self) -> bool {
        self.kind == other.kind
    }

    /// The same kind with a different amount.
    #[must_use]
    pub fn with_amount(&self, amount: u64) -> Self {
        Self::new(self.kind, amount)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.kind)
    }
}

/// Validate a list of items: non-empty, each a whole item, no duplicates.
///
/// # Errors
/// [`ValidationError::EmptyListing`], [`ValidationError::DuplicateItem`] or
/// an item-level validation error.
pub fn validate_items(items: &[Asset]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyListing);
    }
    if items.len() > crate::constants::MAX_ITEMS_PER_LISTING {
        return Err(ValidationError::Config(format!(
            "at most {} items per listing",
            crate::constants::MAX_ITEMS_PER_LISTING
        )));
    }
    for (i, item) in items.iter().enumerate() {
        item.validate_item()?;
        if items[..i].iter().any(|prev| prev.same_kind(item)) {
            return Err(ValidationError::DuplicateItem);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(serial: u64) -> TokenId {
        TokenId::new(Address::from_seed(7), serial)
    }

    #[test]
    fn zero_amount_rejected() {
        assert_eq!(Asset::native(0).validate(), Err(ValidationError::ZeroAmount));
        assert!(Asset::native(5).validate().is_ok());
    }

    #[test]
    fn nft_must_be_single() {
        let fractional = Asset::new(AssetKind::Issued(token(1)), 2);
        assert_eq!(fractional.validate_item(), Err(ValidationError::FractionalItem));
        assert_eq!(Asset::native(1).validate_item(), Err(ValidationError::FractionalItem));
        assert!(Asset::nft(token(1)).validate_item().is_ok());
    }

    #[test]
    fn kind_equality() {
        assert!(Asset::native(1).same_kind(&Asset::native(9)));
        assert!(!Asset::nft(token(1)).same_kind(&Asset::nft(token(2))));
        assert!(!Asset::native(1).same_kind(&Asset::nft(token(1))));
    }

    #[test]
    fn item_list_validation() {
        assert_eq!(validate_items(&[]), Err(ValidationError::EmptyListing));
        assert_eq!(
            validate_items(&[Asset::nft(token(1)), Asset::nft(token(1))]),
            Err(ValidationError::DuplicateItem)
        );
        assert!(validate_items(&[Asset::nft(token(1)), Asset::nft(token(2))]).is_ok());
    }

    #[test]
    fn display() {
        assert_eq!(Asset::native(10).to_string(), "10 NATIVE");
    }
}
