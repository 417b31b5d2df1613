//! The public marketplace API.
//!
//! [`Marketplace`] owns the host and runs every mutating operation as one
//! invocation: `begin`, the operation, then `commit` on success or
//! `rollback` on any error, so a failed call leaves storage, balances, the
//! sequence counter and the event log exactly as they were.

use marketsettle_host::Host;
use marketsettle_types::{
    Address, Asset, AssetKind, Auction, AuctionConfig, AuctionId, AuctionState, Bid, BidId,
    Commitment, Dispute, DisputeConfig, DisputeId, EventKind, FeeConfig, ListedItem, MarketConfig,
    ReasonCode, Result, SettlementRecord, StateError, Transaction, TransactionId, Verdict,
};

use crate::admin;
use crate::auction::{self, AuctionParams};
use crate::dispute;
use crate::storage::{
    AuctionStore, ConfigStore, DisputeStore, TransactionStore, Treasury, TreasuryStore,
};
use crate::swap::{self, Listing, TradeTerms};

pub struct Marketplace<H: Host> {
    host: H,
}

impl<H: Host> Marketplace<H> {
    #[must_use]
    pub fn new(host: H) -> Self {
        Self { host }
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Direct host access, for minting, moving the clock and authorizing
    /// callers between invocations.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub fn into_host(self) -> H {
        self.host
    }

    /// Run `f` as one all-or-nothing invocation.
    fn invoke<T>(&mut self, op: &'static str, f: impl FnOnce(&mut H) -> Result<T>) -> Result<T> {
        let span = tracing::info_span!("invoke", op);
        let _enter = span.enter();
        self.host.begin();
        match f(&mut self.host) {
            Ok(value) => {
                self.host.commit();
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(op, category = err.category(), error = %err, "invocation aborted");
                self.host.rollback();
                Err(err)
            }
        }
    }

    /// Like [`Self::invoke`], with the persisted configuration loaded.
    fn invoke_configured<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut H, &MarketConfig) -> Result<T>,
    ) -> Result<T> {
        self.invoke(op, |host| {
            let config = ConfigStore::load(host)?;
            f(host, &config)
        })
    }

    // -- setup ---------------------------------------------------------------

    /// One-time setup. Arbiters default to a quorum of
    /// `min(arbiters, 3)`; refine with [`Self::update_dispute_config`].
    pub fn initialize(
        &mut self,
        admin: Address,
        fee: FeeConfig,
        arbiters: Vec<Address>,
    ) -> Result<()> {
        self.invoke("initialize", |host| {
            host.require_auth(&admin)?;
            if ConfigStore::exists(host) {
                return Err(StateError::AlreadyInitialized.into());
            }
            let mut config = MarketConfig::new(admin, fee, arbiters);
            config.fee.updated_by = Some(admin);
            config.fee.updated_at = host.timestamp();
            config.validate()?;
            ConfigStore::save(host, &config)?;
            TreasuryStore::save(host, &Treasury::default())?;
            host.emit(EventKind::Initialized { admin });
            tracing::info!(
                admin = %admin,
                fee_bps = config.fee.base_fee_bps,
                arbiters = config.dispute.arbiters.len(),
                "marketplace initialized"
            );
            Ok(())
        })
    }

    // -- sales, bundles, trades ---------------------------------------------

    pub fn create_sale(
        &mut self,
        seller: Address,
        item: ListedItem,
        price: Asset,
        duration: u64,
    ) -> Result<TransactionId> {
        let listing = Listing {
            items: vec![item],
            price,
            duration,
            buyer: None,
        };
        self.invoke_configured("create_sale", |host, config| {
            swap::create_listing(host, config, seller, listing, false)
        })
    }

    /// A sale only `buyer` may execute.
    pub fn create_private_sale(
        &mut self,
        seller: Address,
        item: ListedItem,
        price: Asset,
        duration: u64,
        buyer: Address,
    ) -> Result<TransactionId> {
        let listing = Listing {
            items: vec![item],
            price,
            duration,
            buyer: Some(buyer),
        };
        self.invoke_configured("create_private_sale", |host, config| {
            swap::create_listing(host, config, seller, listing, false)
        })
    }

    pub fn create_bundle(
        &mut self,
        seller: Address,
        items: Vec<ListedItem>,
        price: Asset,
        duration: u64,
    ) -> Result<TransactionId> {
        let listing = Listing {
            items,
            price,
            duration,
            buyer: None,
        };
        self.invoke_configured("create_bundle", |host, config| {
            swap::create_listing(host, config, seller, listing, true)
        })
    }

    pub fn execute_sale(
        &mut self,
        id: TransactionId,
        buyer: Address,
        payment: Asset,
    ) -> Result<SettlementRecord> {
        self.invoke_configured("execute_sale", |host, config| {
            swap::execute_sale(host, config, id, buyer, payment)
        })
    }

    pub fn create_trade(&mut self, initiator: Address, terms: TradeTerms) -> Result<TransactionId> {
        self.invoke_configured("create_trade", |host, config| {
            swap::create_trade(host, config, initiator, terms)
        })
    }

    pub fn accept_trade(&mut self, id: TransactionId, counterparty: Address) -> Result<()> {
        self.invoke_configured("accept_trade", |host, _| swap::accept_trade(host, id, counterparty))
    }

    pub fn execute_trade(
        &mut self,
        id: TransactionId,
        caller: Address,
    ) -> Result<SettlementRecord> {
        self.invoke_configured("execute_trade", |host, config| {
            swap::execute_trade(host, config, id, caller)
        })
    }

    pub fn cancel_transaction(&mut self, id: TransactionId, caller: Address) -> Result<()> {
        self.invoke_configured("cancel_transaction", |host, _| {
            swap::cancel_transaction(host, id, caller)
        })
    }

    // -- auctions -----------------------------------------------------------

    pub fn create_auction(&mut self, seller: Address, params: AuctionParams) -> Result<AuctionId> {
        self.invoke_configured("create_auction", |host, config| {
            auction::create_auction(host, config, seller, params)
        })
    }

    /// Place a plaintext bid of `amount`, or with `commitment` a sealed bid
    /// backed by a deposit of `amount`.
    pub fn place_bid(
        &mut self,
        id: AuctionId,
        bidder: Address,
        amount: u64,
        commitment: Option<Commitment>,
    ) -> Result<BidId> {
        self.invoke_configured("place_bid", |host, config| {
            auction::place_bid(host, config, id, bidder, amount, commitment)
        })
    }

    /// Returns whether the revealed bid now leads.
    pub fn reveal_bid(
        &mut self,
        id: AuctionId,
        bidder: Address,
        amount: u64,
        salt: &[u8; 32],
    ) -> Result<bool> {
        self.invoke_configured("reveal_bid", |host, _| {
            auction::reveal_bid(host, id, bidder, amount, salt)
        })
    }

    pub fn end_auction(&mut self, id: AuctionId) -> Result<AuctionState> {
        self.invoke_configured("end_auction", |host, config| auction::end_auction(host, config, id))
    }

    pub fn cancel_auction(&mut self, id: AuctionId, caller: Address) -> Result<()> {
        self.invoke_configured("cancel_auction", |host, _| {
            auction::cancel_auction(host, id, caller)
        })
    }

    // -- disputes -----------------------------------------------------------

    pub fn initiate_dispute(
        &mut self,
        transaction: TransactionId,
        initiator: Address,
        reason: ReasonCode,
    ) -> Result<DisputeId> {
        self.invoke_configured("initiate_dispute", |host, config| {
            dispute::initiate_dispute(host, config, transaction, initiator, reason)
        })
    }

    pub fn vote_on_dispute(
        &mut self,
        id: DisputeId,
        arbiter: Address,
        verdict: Verdict,
    ) -> Result<()> {
        self.invoke_configured("vote_on_dispute", |host, _| {
            dispute::vote_on_dispute(host, id, arbiter, verdict)
        })
    }

    pub fn submit_evidence(
        &mut self,
        id: DisputeId,
        submitter: Address,
        uri: String,
    ) -> Result<()> {
        self.invoke_configured("submit_evidence", |host, _| {
            dispute::submit_evidence(host, id, submitter, uri)
        })
    }

    pub fn execute_dispute_resolution(&mut self, id: DisputeId) -> Result<SettlementRecord> {
        self.invoke_configured("execute_dispute_resolution", |host, config| {
            dispute::execute_dispute_resolution(host, config, id)
        })
    }

    /// Administrator override: settle an open dispute with `verdict` now.
    pub fn force_resolve_dispute(
        &mut self,
        admin: Address,
        id: DisputeId,
        verdict: Verdict,
    ) -> Result<SettlementRecord> {
        self.invoke("force_resolve_dispute", |host| {
            dispute::force_resolve_dispute(host, id, admin, verdict)
        })
    }

    // -- administration -----------------------------------------------------

    pub fn update_fee_config(&mut self, admin: Address, fee: FeeConfig) -> Result<()> {
        self.invoke("update_fee_config", |host| admin::update_fee_config(host, admin, fee))
    }

    pub fn update_auction_config(&mut self, admin: Address, config: AuctionConfig) -> Result<()> {
        self.invoke("update_auction_config", |host| {
            admin::update_auction_config(host, admin, config)
        })
    }

    pub fn update_dispute_config(&mut self, admin: Address, config: DisputeConfig) -> Result<()> {
        self.invoke("update_dispute_config", |host| {
            admin::update_dispute_config(host, admin, config)
        })
    }

    pub fn set_emergency_withdrawal(&mut self, admin: Address, enabled: bool) -> Result<()> {
        self.invoke("set_emergency_withdrawal", |host| {
            admin::set_emergency_withdrawal(host, admin, enabled)
        })
    }

    pub fn withdraw_platform_fees(&mut self, admin: Address, amount: Asset) -> Result<()> {
        self.invoke("withdraw_platform_fees", |host| {
            admin::withdraw_platform_fees(host, admin, amount)
        })
    }

    pub fn emergency_withdraw(
        &mut self,
        admin: Address,
        transaction: TransactionId,
    ) -> Result<SettlementRecord> {
        self.invoke("emergency_withdraw", |host| {
            admin::emergency_withdraw(host, admin, transaction)
        })
    }

    // -- queries ------------------------------------------------------------

    pub fn config(&self) -> Result<MarketConfig> {
        ConfigStore::load(&self.host)
    }

    pub fn transaction(&self, id: TransactionId) -> Result<Transaction> {
        TransactionStore::require(&self.host, id)
    }

    pub fn auction(&self, id: AuctionId) -> Result<Auction> {
        AuctionStore::require(&self.host, id)
    }

    /// Bids in placement order.
    pub fn bids(&self, id: AuctionId) -> Result<Vec<Bid>> {
        AuctionStore::require(&self.host, id)?;
        AuctionStore::bids(&self.host, id)
    }

    /// Current Dutch price at the host clock.
    pub fn dutch_price(&self, id: AuctionId) -> Result<u64> {
        let record = AuctionStore::require(&self.host, id)?;
        Ok(auction::dutch_price(&record, self.host.timestamp()))
    }

    pub fn dispute(&self, id: DisputeId) -> Result<Dispute> {
        DisputeStore::require(&self.host, id)
    }

    pub fn dispute_for_transaction(&self, id: TransactionId) -> Result<Option<Dispute>> {
        DisputeStore::for_transaction(&self.host, id)?
            .map(|d| DisputeStore::require(&self.host, d))
            .transpose()
    }

    pub fn platform_fee_balance(&self, kind: &AssetKind) -> Result<u64> {
        Ok(TreasuryStore::load(&self.host)?.fee_balance(kind))
    }

    pub fn seller_volume(&self, seller: &Address) -> Result<u64> {
        Ok(TreasuryStore::load(&self.host)?.volume(seller))
    }
}

#[cfg(test)]
mod tests {
    use marketsettle_host::MemoryHost;
    use marketsettle_types::{NotFoundError, RoyaltyDistribution, TokenId};

    use super::*;

    fn admin() -> Address {
        Address::from_seed(100)
    }

    fn market() -> Marketplace<MemoryHost> {
        let mut market = Marketplace::new(MemoryHost::mock_all_auths());
        market
            .initialize(admin(), FeeConfig::flat(250), vec![Address::from_seed(200)])
            .unwrap();
        market
    }

    #[test]
    fn operations_require_initialization() {
        let mut market = Marketplace::new(MemoryHost::mock_all_auths());
        let err = market.set_emergency_withdrawal(admin(), true).unwrap_err();
        assert_eq!(err, StateError::NotInitialized.into());
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let market = market();
        assert_eq!(
            market.transaction(TransactionId(77)).unwrap_err(),
            NotFoundError::Transaction(TransactionId(77)).into()
        );
        assert_eq!(
            market.auction(AuctionId(5)).unwrap_err(),
            NotFoundError::Auction(AuctionId(5)).into()
        );
        assert!(market.dispute_for_transaction(TransactionId(77)).unwrap().is_none());
    }

    #[test]
    fn failed_invocation_leaves_no_trace() {
        let mut market = market();
        let seller = Address::from_seed(1);
        let before = market.host().state_fingerprint();
        let events = market.host().events().len();

        // The seller never received the token, so the escrow lock fails
        // after the sequence counter has already advanced.
        let item = ListedItem::new(
            Asset::nft(TokenId::new(Address::from_seed(250), 1)),
            RoyaltyDistribution::none(seller),
        );
        assert!(market.create_sale(seller, item, Asset::native(100), 600).is_err());

        assert_eq!(market.host().state_fingerprint(), before);
        assert_eq!(market.host().events().len(), events);
    }
}
