use marketsettle_host::Host;
use marketsettle_types::{
    Auction, AuctionId, Bid, BidId, LockKey, NotFoundError, Result, StorageError, StorageKey,
};

use super::{LockToken, load, save};

/// auction-id → [`Auction`], plus the bid index auction-id → ordered bid ids.
pub struct AuctionStore;

impl AuctionStore {
    pub fn get<H: Host>(host: &H, id: AuctionId) -> Result<Option<Auction>> {
        load(host, &StorageKey::Auction(id))
    }

    pub fn require<H: Host>(host: &H, id: AuctionId) -> Result<Auction> {
        Self::get(host, id)?.ok_or_else(|| NotFoundError::Auction(id).into())
    }

    pub fn insert<H: Host>(host: &mut H, auction: &Auction) -> Result<()> {
        let key = StorageKey::Auction(auction.id);
        if host.storage_get(&key).is_some() {
            return Err(StorageError::Corrupt {
                key: key.to_string(),
                reason: "record already exists".into(),
            }
            .into());
        }
        save(host, key, auction)?;
        save(host, StorageKey::AuctionBids(auction.id), &Vec::<BidId>::new())
    }

    pub fn put<H: Host>(host: &mut H, token: &LockToken, auction: &Auction) -> Result<()> {
        token.check(LockKey::Auction(auction.id))?;
        save(host, StorageKey::Auction(auction.id), auction)
    }

    /// Bid ids of an auction in placement order.
    pub fn bid_ids<H: Host>(host: &H, auction: AuctionId) -> Result<Vec<BidId>> {
        Ok(load(host, &StorageKey::AuctionBids(auction))?.unwrap_or_default())
    }

    pub fn bids<H: Host>(host: &H, auction: AuctionId) -> Result<Vec<Bid>> {
        Self::bid_ids(host, auction)?
            .into_iter()
            .map(|id| Self::bid(host, id))
            .collect()
    }

    pub fn bid<H: Host>(host: &H, id: BidId) -> Result<Bid> {
        load(host, &StorageKey::Bid(id))?.ok_or_else(|| NotFoundError::Bid(id).into())
    }

    /// Store a new bid and append it to its auction's index.
    pub fn insert_bid<H: Host>(host: &mut H, token: &LockToken, bid: &Bid) -> Result<()> {
        token.check(LockKey::Auction(bid.auction))?;
        let mut index = Self::bid_ids(host, bid.auction)?;
        index.push(bid.id);
        save(host, StorageKey::Bid(bid.id), bid)?;
        save(host, StorageKey::AuctionBids(bid.auction), &index)
    }

    pub fn put_bid<H: Host>(host: &mut H, token: &LockToken, bid: &Bid) -> Result<()> {
        token.check(LockKey::Auction(bid.auction))?;
        save(host, StorageKey::Bid(bid.id), bid)
    }
}
