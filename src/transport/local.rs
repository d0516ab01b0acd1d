//! In-process transport: an address-keyed registry of live
//! [`LocalPeer`]s, grounded in `LocalChordTransport`/`LocalChordHandler`
//! from the Python reference simulator. Calling an address not currently
//! registered (never joined, or shut down) answers `NodeFailure`, exactly
//! as a dropped TCP connection would for [`super::grpc::GrpcTransport`].
//!
//! Used by `chord-sim` to run a whole ring in one process, and by the
//! integration tests to exercise the real routing code with no sockets.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::address::Address;
use crate::error::{ChordError, Result};
use crate::identifier::Bucket;
use crate::peer::{LocalPeer, Peer};

use super::Transport;

#[derive(Default)]
pub struct LocalTransport {
    registry: Mutex<HashMap<Address, Arc<LocalPeer>>>,
}

impl LocalTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(LocalTransport::default())
    }

    /// Registers a node so other peers can reach it by address. Called
    /// once per node right after construction, before `create`/`join`.
    pub fn register(&self, peer: Arc<LocalPeer>) {
        self.registry
            .lock()
            .unwrap()
            .insert(peer.address().clone(), peer);
    }

    /// Removes a node from the registry, as `LocalChordHandler.shutdown`
    /// deletes it from `nodes`/`joined_list`. Subsequent calls to its
    /// address report `NodeFailure`.
    pub fn deregister(&self, address: &Address) {
        self.registry.lock().unwrap().remove(address);
    }

    fn lookup(&self, target: &Address) -> Result<Arc<LocalPeer>> {
        self.registry
            .lock()
            .unwrap()
            .get(target)
            .cloned()
            .filter(|p| !p.is_shutdown())
            .ok_or_else(|| ChordError::NodeFailure(target.clone()))
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn node(&self, target: &Address) -> Result<bool> {
        self.lookup(target)?.node().await
    }

    async fn create(&self, target: &Address) -> Result<()> {
        self.lookup(target)?.create().await
    }

    async fn join(&self, target: &Address, bootstrap: &Address) -> Result<()> {
        let bootstrap_peer = self.lookup(bootstrap)?;
        self.lookup(target)?.join(bootstrap_peer).await
    }

    async fn find_successor(
        &self,
        target: &Address,
        key: Bucket,
        ring_bits: u32,
    ) -> Result<(Address, u32)> {
        let peer = self.lookup(target)?;
        if peer.ring_bits() != ring_bits {
            return Err(ChordError::Protocol(format!(
                "ring size mismatch: caller uses m={ring_bits}, {target} uses m={}",
                peer.ring_bits()
            )));
        }
        let (owner, hops) = peer.find_successor(key).await?;
        Ok((owner.address().clone(), hops))
    }

    async fn get_predecessor(&self, target: &Address) -> Result<Option<Address>> {
        let predecessor = self.lookup(target)?.get_predecessor().await?;
        Ok(predecessor.map(|p| p.address().clone()))
    }

    async fn get_successor_list(&self, target: &Address) -> Result<Vec<Address>> {
        let list = self.lookup(target)?.get_successor_list().await?;
        Ok(list.iter().map(|p| p.address().clone()).collect())
    }

    async fn notify(&self, target: &Address, candidate: Option<Address>) -> Result<()> {
        let peer = self.lookup(target)?;
        let candidate_handle: Option<crate::peer::PeerHandle> = match candidate {
            Some(addr) => {
                let resolved: crate::peer::PeerHandle = self.lookup(&addr)?;
                Some(resolved)
            }
            None => None,
        };
        peer.notify(candidate_handle).await
    }

    async fn shutdown(&self, target: &Address) -> Result<()> {
        let peer = self.lookup(target)?;
        let result = peer.shutdown().await;
        self.deregister(target);
        result
    }

    async fn get_key(
        &self,
        target: &Address,
        key: &str,
    ) -> Result<(Address, u32, Option<String>, bool)> {
        let outcome = self.lookup(target)?.get(key).await?;
        Ok((outcome.owner.address().clone(), outcome.hops, outcome.value, outcome.found))
    }

    async fn put_key(
        &self,
        target: &Address,
        key: &str,
        value: &str,
        no_redirect: bool,
    ) -> Result<(Address, u32)> {
        let outcome = self
            .lookup(target)?
            .put(key, value.to_string(), no_redirect)
            .await?;
        Ok((outcome.owner.address().clone(), outcome.hops))
    }
}
