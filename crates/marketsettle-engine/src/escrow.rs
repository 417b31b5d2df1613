//! Escrow manager: moves assets into and out of the contract's custody.
//!
//! Every holding lives on its transaction's `escrow` list. `lock` debits
//! the depositor and appends a holding; `take` removes holdings before they
//! are paid out, so a holding is released exactly once. Each payout is
//! recorded as a [`Transfer`] for the settlement receipt.

use marketsettle_host::Host;
use marketsettle_types::{
    Address, Asset, BidId, EscrowHolding, HolderRole, Result, Transaction, Transfer,
    TransferPurpose,
};

pub struct EscrowManager<'h, H: Host> {
    host: &'h mut H,
    contract: Address,
    transfers: Vec<Transfer>,
}

impl<'h, H: Host> EscrowManager<'h, H> {
    pub fn new(host: &'h mut H) -> Self {
        let contract = host.contract_address();
        Self {
            host,
            contract,
            transfers: Vec::new(),
        }
    }

    #[must_use]
    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn host(&mut self) -> &mut H {
        &mut *self.host
    }

    /// Move `asset` from `depositor` into custody for `tx`.
    pub fn lock(
        &mut self,
        tx: &mut Transaction,
        depositor: Address,
        role: HolderRole,
        asset: Asset,
        bid: Option<BidId>,
    ) -> Result<()> {
        asset.validate()?;
        self.host.transfer(&depositor, &self.contract, &asset)?;
        tx.escrow.push(EscrowHolding {
            transaction: tx.id,
            depositor,
            role,
            asset,
            locked_at: self.host.timestamp(),
            bid,
        });
        tracing::debug!(
            tx = %tx.id,
            depositor = %depositor,
            role = %role,
            asset = %asset,
            "escrow locked"
        );
        Ok(())
    }

    /// Remove and return every holding matching `pred`.
    pub fn take(
        tx: &mut Transaction,
        pred: impl Fn(&EscrowHolding) -> bool,
    ) -> Vec<EscrowHolding> {
        let (taken, kept): (Vec<_>, Vec<_>) = tx.escrow.drain(..).partition(|h| pred(h));
        tx.escrow = kept;
        taken
    }

    /// Remove the holding backing `bid`, if any.
    pub fn take_bid(tx: &mut Transaction, bid: BidId) -> Option<EscrowHolding> {
        Self::take(tx, |h| h.bid == Some(bid)).into_iter().next()
    }

    /// Pay `asset` out of custody. Zero amounts are skipped.
    pub fn pay_out(&mut self, to: Address, asset: Asset, purpose: TransferPurpose) -> Result<()> {
        self.pay(self.contract, to, asset, purpose)
    }

    /// Move `asset` between two accounts as part of a settlement. Zero
    /// amounts are skipped; custody-to-custody moves are recorded without
    /// touching the ledger.
    pub fn pay(
        &mut self,
        from: Address,
        to: Address,
        asset: Asset,
        purpose: TransferPurpose,
    ) -> Result<()> {
        if asset.amount == 0 {
            return Ok(());
        }
        if from != to {
            self.host.transfer(&from, &to, &asset)?;
        }
        self.transfers.push(Transfer {
            from,
            to,
            asset,
            purpose,
        });
        Ok(())
    }

    /// Keep a holding in custody for the platform, recording the transfer
    /// from its depositor without touching the ledger.
    pub fn retain(&mut self, holding: &EscrowHolding, purpose: TransferPurpose) {
        self.transfers.push(Transfer {
            from: holding.depositor,
            to: self.contract,
            asset: holding.asset,
            purpose,
        });
    }

    /// Return a holding to its depositor.
    pub fn refund(&mut self, holding: &EscrowHolding) -> Result<()> {
        tracing::debug!(
            tx = %holding.transaction,
            depositor = %holding.depositor,
            asset = %holding.asset,
            "escrow refunded"
        );
        self.pay_out(holding.depositor, holding.asset, TransferPurpose::Refund)
    }

    /// Return every remaining holding of `tx` to its depositor.
    pub fn refund_all(&mut self, tx: &mut Transaction) -> Result<usize> {
        let holdings = Self::take(tx, |_| true);
        for holding in &holdings {
            self.refund(holding)?;
        }
        Ok(holdings.len())
    }

    /// Transfers recorded so far.
    #[must_use]
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub fn into_transfers(self) -> Vec<Transfer> {
        self.transfers
    }
}

#[cfg(test)]
mod tests {
    use marketsettle_host::MemoryHost;
    use marketsettle_types::{
        AssetKind, ListedItem, RoyaltyDistribution, TokenId, TransactionId, TransactionKind,
        TransactionState,
    };

    use super::*;

    fn seller() -> Address {
        Address::from_seed(1)
    }

    fn nft() -> Asset {
        Asset::nft(TokenId::new(Address::from_seed(9), 1))
    }

    fn tx() -> Transaction {
        Transaction {
            id: TransactionId(1),
            seller: seller(),
            counterparty: None,
            kind: TransactionKind::Sale {
                item: ListedItem::new(nft(), RoyaltyDistribution::none(seller())),
            },
            price: Some(Asset::native(100)),
            state: TransactionState::Created,
            escrow: Vec::new(),
            created_at: 0,
            expires_at: 10,
            settlement: None,
        }
    }

    #[test]
    fn lock_moves_into_custody() {
        let mut host = MemoryHost::mock_all_auths();
        host.mint(&seller(), &nft()).unwrap();
        let mut tx = tx();
        let mut escrow = EscrowManager::new(&mut host);
        escrow.lock(&mut tx, seller(), HolderRole::Seller, nft(), None).unwrap();
        let contract = escrow.contract();
        assert_eq!(tx.escrow.len(), 1);
        assert_eq!(host.owner_of(&nft().kind), Some(contract));
    }

    #[test]
    fn refund_all_empties_escrow_once() {
        let mut host = MemoryHost::mock_all_auths();
        host.mint(&seller(), &nft()).unwrap();
        host.mint(&seller(), &Asset::native(5)).unwrap();
        let mut tx = tx();
        let mut escrow = EscrowManager::new(&mut host);
        escrow.lock(&mut tx, seller(), HolderRole::Seller, nft(), None).unwrap();
        escrow.lock(&mut tx, seller(), HolderRole::Seller, Asset::native(5), None).unwrap();
        assert_eq!(escrow.refund_all(&mut tx).unwrap(), 2);
        assert_eq!(escrow.refund_all(&mut tx).unwrap(), 0);
        assert_eq!(escrow.transfers().len(), 2);
        assert_eq!(host.balance(&seller(), &AssetKind::Native), 5);
        assert_eq!(host.owner_of(&nft().kind), Some(seller()));
        host.verify_supply().unwrap();
    }

    #[test]
    fn take_bid_removes_only_that_holding() {
        let mut host = MemoryHost::mock_all_auths();
        let bidder = Address::from_seed(2);
        host.mint(&bidder, &Asset::native(50)).unwrap();
        let mut tx = tx();
        let mut escrow = EscrowManager::new(&mut host);
        escrow
            .lock(&mut tx, bidder, HolderRole::Bidder, Asset::native(20), Some(BidId(1)))
            .unwrap();
        escrow
            .lock(&mut tx, bidder, HolderRole::Bidder, Asset::native(30), Some(BidId(2)))
            .unwrap();
        let taken = EscrowManager::<MemoryHost>::take_bid(&mut tx, BidId(2)).unwrap();
        assert_eq!(taken.asset.amount, 30);
        assert_eq!(tx.escrow.len(), 1);
        assert!(EscrowManager::<MemoryHost>::take_bid(&mut tx, BidId(2)).is_none());
    }

    #[test]
    fn lock_without_funds_fails() {
        let mut host = MemoryHost::mock_all_auths();
        let mut tx = tx();
        let mut escrow = EscrowManager::new(&mut host);
        assert!(escrow.lock(&mut tx, seller(), HolderRole::Seller, nft(), None).is_err());
        assert!(tx.escrow.is_empty());
    }
}
