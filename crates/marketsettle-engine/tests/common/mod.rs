//! Shared harness for the engine integration tests.

#![allow(dead_code)]

use marketsettle_engine::Marketplace;
use marketsettle_host::{Host, MemoryHost};
use marketsettle_types::{
    Address, Asset, AssetKind, FeeConfig, ListedItem, RoyaltyDistribution, TokenId,
};

/// A marketplace on an in-memory host where every caller is authorized.
pub struct Harness {
    pub market: Marketplace<MemoryHost>,
    pub admin: Address,
    pub arbiters: Vec<Address>,
    pub collection: Address,
}

impl Harness {
    pub fn new(fee_bps: u32) -> Self {
        init_tracing();
        let admin = Address::from_seed(100);
        let arbiters: Vec<Address> = (200..203).map(Address::from_seed).collect();
        let mut market = Marketplace::new(MemoryHost::mock_all_auths());
        market
            .initialize(admin, FeeConfig::flat(fee_bps), arbiters.clone())
            .expect("initialize should succeed");
        Self {
            market,
            admin,
            arbiters,
            collection: Address::from_seed(250),
        }
    }

    pub fn host(&mut self) -> &mut MemoryHost {
        self.market.host_mut()
    }

    pub fn fund(&mut self, who: Address, amount: u64) {
        self.host()
            .mint(&who, &Asset::native(amount))
            .expect("mint native");
    }

    /// Mint NFT `serial` of the test collection to `owner`.
    pub fn mint_nft(&mut self, owner: Address, serial: u64) -> Asset {
        let nft = Asset::nft(TokenId::new(self.collection, serial));
        self.host().mint(&owner, &nft).expect("mint nft");
        nft
    }

    /// An item with no creator royalty.
    pub fn plain_item(&mut self, owner: Address, serial: u64) -> ListedItem {
        let nft = self.mint_nft(owner, serial);
        ListedItem::new(nft, RoyaltyDistribution::none(owner))
    }

    pub fn balance(&self, who: Address) -> u64 {
        self.market.host().balance(&who, &AssetKind::Native)
    }

    pub fn owner(&self, item: Asset) -> Option<Address> {
        self.market.host().owner_of(&item.kind)
    }

    pub fn contract(&self) -> Address {
        self.market.host().contract_address()
    }

    pub fn set_time(&mut self, t: u64) {
        self.host().set_timestamp(t);
    }

    pub fn fingerprint(&self) -> String {
        self.market.host().state_fingerprint()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
