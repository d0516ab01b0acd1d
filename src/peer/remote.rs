//! `RemotePeer`: a peer handle that relays every operation through a
//! [`Transport`] — an address plus an attached connection. Holds no state
//! of its own beyond the address and its cached bucket — every call is a
//! round trip.

use async_trait::async_trait;

use crate::address::Address;
use crate::error::Result;
use crate::identifier::{bucketize, Bucket};

use super::{resolver::PeerResolver, GetOutcome, Peer, PeerHandle, PutOutcome};

pub struct RemotePeer {
    address: Address,
    bucket: Bucket,
    resolver: PeerResolver,
}

impl RemotePeer {
    pub(crate) fn new(address: Address, ring_bits: u32, resolver: PeerResolver) -> Self {
        let bucket = bucketize(address.as_str(), ring_bits);
        RemotePeer { address, bucket, resolver }
    }
}

#[async_trait]
impl Peer for RemotePeer {
    fn address(&self) -> &Address {
        &self.address
    }

    fn bucket(&self) -> Bucket {
        self.bucket
    }

    async fn node(&self) -> Result<bool> {
        self.resolver.transport().node(&self.address).await
    }

    async fn find_successor(&self, key: Bucket) -> Result<(PeerHandle, u32)> {
        let (owner, hops) = self
            .resolver
            .transport()
            .find_successor(&self.address, key, self.resolver.ring_bits())
            .await?;
        Ok((self.resolver.resolve(&owner), hops))
    }

    async fn get_predecessor(&self) -> Result<Option<PeerHandle>> {
        let predecessor = self.resolver.transport().get_predecessor(&self.address).await?;
        Ok(predecessor.map(|addr| self.resolver.resolve(&addr)))
    }

    async fn get_successor_list(&self) -> Result<Vec<PeerHandle>> {
        let addrs = self.resolver.transport().get_successor_list(&self.address).await?;
        Ok(addrs.iter().map(|a| self.resolver.resolve(a)).collect())
    }

    async fn notify(&self, candidate: Option<PeerHandle>) -> Result<()> {
        let addr = candidate.map(|c| c.address().clone());
        self.resolver.transport().notify(&self.address, addr).await
    }

    async fn get(&self, key: &str) -> Result<GetOutcome> {
        let (owner, hops, value, found) =
            self.resolver.transport().get_key(&self.address, key).await?;
        Ok(GetOutcome { owner: self.resolver.resolve(&owner), hops, value, found })
    }

    async fn put(&self, key: &str, value: String, no_redirect: bool) -> Result<PutOutcome> {
        let (owner, hops) = self
            .resolver
            .transport()
            .put_key(&self.address, key, &value, no_redirect)
            .await?;
        Ok(PutOutcome { owner: self.resolver.resolve(&owner), hops })
    }

    async fn shutdown(&self) -> Result<()> {
        self.resolver.transport().shutdown(&self.address).await
    }
}
