//! `LocalPeer`: the peer core. Owns state and storage; everything in
//! this file runs without a network hop. Routing to other peers always
//! goes through a [`PeerHandle`] resolved by this node's
//! [`PeerResolver`] — `LocalPeer` itself never touches a
//! [`crate::transport::Transport`] directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::address::Address;
use crate::config::RingConfig;
use crate::error::{ChordError, Result};
use crate::finger_table::FingerTable;
use crate::identifier::{between, bucketize, Bucket};
use crate::storage::Storage;
use crate::successor_list::SuccessorList;

use super::{GetOutcome, Peer, PeerHandle, PeerResolver, PutOutcome};

pub struct LocalPeer {
    self_address: Address,
    self_bucket: Bucket,
    config: RingConfig,
    predecessor: Mutex<Option<PeerHandle>>,
    fingers: FingerTable,
    successors: SuccessorList,
    storage: Arc<dyn Storage>,
    shutdown: AtomicBool,
    resolver: PeerResolver,
}

impl LocalPeer {
    /// Constructs a shut-down node. `resolver`'s `self_handle` is wired up
    /// via `Arc::new_cyclic` so this peer can resolve its own address back
    /// to itself with no network round trip and no reference cycle.
    pub fn new(
        self_address: Address,
        config: RingConfig,
        storage: Arc<dyn Storage>,
        transport: Arc<dyn crate::transport::Transport>,
    ) -> Arc<LocalPeer> {
        let self_bucket = bucketize(self_address.as_str(), config.m);
        Arc::new_cyclic(|weak: &Weak<LocalPeer>| {
            let weak_peer: Weak<dyn Peer> = weak.clone() as Weak<dyn Peer>;
            LocalPeer {
                fingers: FingerTable::new(self_bucket, config.m),
                successors: SuccessorList::new(config.r),
                predecessor: Mutex::new(None),
                storage,
                shutdown: AtomicBool::new(true),
                resolver: PeerResolver::new(self_address.clone(), weak_peer, transport, config.m),
                self_address,
                self_bucket,
                config,
            }
        })
    }

    pub fn handle(&self) -> PeerHandle {
        self.resolver.resolve(&self.self_address)
    }

    /// Turns a wire address back into a `PeerHandle`, for server adapters.
    pub fn resolve(&self, address: &Address) -> PeerHandle {
        self.resolver.resolve(address)
    }

    pub fn ring_bits(&self) -> u32 {
        self.config.m
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Initializes a ring of one: `create` on an already-initialized
    /// node is a programmer error.
    pub async fn create(&self) -> Result<()> {
        if !self.is_shutdown() {
            return Err(ChordError::State(format!(
                "{} is already initialized",
                self.self_address
            )));
        }
        let me = self.handle();
        self.successors.replace(vec![me; self.config.r]);
        *self.predecessor.lock().unwrap() = None;
        self.shutdown.store(false, Ordering::Release);
        info!("{} created a new ring", self.self_address);
        Ok(())
    }

    /// Joins the ring reachable through `bootstrap`, adopting its
    /// successor's successor list as a starting point.
    pub async fn join(&self, bootstrap: PeerHandle) -> Result<()> {
        if !self.is_shutdown() {
            return Err(ChordError::State(format!(
                "{} is already initialized",
                self.self_address
            )));
        }
        let (successor, _hops) = bootstrap.find_successor(self.self_bucket).await?;
        let tail = successor.get_successor_list().await?;
        self.successors.replace_with_head(successor, &tail);
        *self.predecessor.lock().unwrap() = None;
        self.shutdown.store(false, Ordering::Release);
        info!(
            "{} joined the ring through {}",
            self.self_address,
            bootstrap.address()
        );
        Ok(())
    }

    /// Refreshes the one finger entry due this round, advancing the
    /// cursor regardless of whether the lookup succeeded.
    pub async fn fix_fingers(&self) -> Result<()> {
        if self.is_shutdown() {
            return Ok(());
        }
        let i = self.fingers.advance_cursor();
        let target = self.fingers.target(i);
        match self.find_successor(target).await {
            Ok((owner, _hops)) => {
                self.fingers.set(i, owner);
                Ok(())
            }
            Err(ChordError::NodeFailure(addr)) => {
                debug!("fix_fingers[{i}] skipped, {addr} unreachable");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    /// Confirms and possibly improves the primary successor by asking it
    /// for its own predecessor and successor list.
    pub async fn stabilize(&self) -> Result<()> {
        if self.is_shutdown() || self.successors.is_empty() {
            return Ok(());
        }
        let primary = match self.successors.primary() {
            Some(p) => p,
            None => return Ok(()),
        };

        let predecessor_of_primary = primary.get_predecessor().await;
        let tail_of_primary = primary.get_successor_list().await;

        let (predecessor_of_primary, tail_of_primary) = match (predecessor_of_primary, tail_of_primary) {
            (Ok(p), Ok(t)) => (p, t),
            (Err(ChordError::NodeFailure(_)), _) | (_, Err(ChordError::NodeFailure(_))) => {
                self.successors.rotate_out_dead_primary(self.handle());
                self.notify_primary().await;
                return Ok(());
            }
            (Err(other), _) | (_, Err(other)) => return Err(other),
        };

        self.successors.replace_with_head(primary.clone(), &tail_of_primary);

        if let Some(candidate) = predecessor_of_primary {
            if between(candidate.bucket(), self.self_bucket, primary.bucket()) {
                if let Ok(tail) = candidate.get_successor_list().await {
                    self.successors.replace_with_head(candidate, &tail);
                }
            }
        }

        self.notify_primary().await;
        Ok(())
    }

    async fn notify_primary(&self) {
        if let Some(primary) = self.successors.primary() {
            if let Err(err) = primary.notify(Some(self.handle())).await {
                debug!("notify to {} failed: {err}", primary.address());
            }
        }
    }

    /// Clears the predecessor pointer if it fails a liveness check.
    pub async fn check_predecessor(&self) -> Result<()> {
        if self.is_shutdown() {
            return Ok(());
        }
        let current = self.predecessor.lock().unwrap().clone();
        if let Some(p) = current {
            match p.node().await {
                Ok(true) => {}
                Ok(false) | Err(ChordError::NodeFailure(_)) => {
                    *self.predecessor.lock().unwrap() = None;
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    /// Every distinct address in the successor list or finger table,
    /// sorted by bucket.
    fn routing_candidates(&self) -> Vec<PeerHandle> {
        let mut seen = std::collections::HashSet::new();
        let mut candidates = Vec::new();
        for peer in self.successors.snapshot().into_iter().chain(self.fingers.populated()) {
            if seen.insert(peer.address().clone()) {
                candidates.push(peer);
            }
        }
        candidates.sort_by_key(|p| p.bucket());
        candidates
    }
}

#[async_trait]
impl Peer for LocalPeer {
    fn address(&self) -> &Address {
        &self.self_address
    }

    fn bucket(&self) -> Bucket {
        self.self_bucket
    }

    async fn node(&self) -> Result<bool> {
        Ok(!self.is_shutdown())
    }

    async fn find_successor(&self, key: Bucket) -> Result<(PeerHandle, u32)> {
        let primary = self.successors.primary();

        if let Some(s) = &primary {
            if between(key, self.self_bucket, s.bucket()) || key == s.bucket() {
                return match s.node().await {
                    Ok(true) => Ok((s.clone(), 0)),
                    Ok(false) | Err(ChordError::NodeFailure(_)) => Ok((self.handle(), 0)),
                    Err(other) => Err(other),
                };
            }
        }

        let mut candidates: Vec<PeerHandle> = self
            .routing_candidates()
            .into_iter()
            .rev()
            .filter(|c| between(c.bucket(), self.self_bucket, key))
            .collect();
        candidates.push(self.handle());

        for candidate in candidates {
            if candidate.address() == &self.self_address {
                return Ok((self.handle(), 0));
            }
            match candidate.find_successor(key).await {
                Ok((owner, hops)) => return Ok((owner, hops + 1)),
                Err(ChordError::NodeFailure(addr)) => {
                    warn!("find_successor candidate {addr} unreachable, trying next");
                    continue;
                }
                Err(other) => return Err(other),
            }
        }

        Err(ChordError::State(format!(
            "{} exhausted every routing candidate without reaching self",
            self.self_address
        )))
    }

    async fn get_predecessor(&self) -> Result<Option<PeerHandle>> {
        Ok(self.predecessor.lock().unwrap().clone())
    }

    async fn get_successor_list(&self) -> Result<Vec<PeerHandle>> {
        Ok(self.successors.snapshot())
    }

    /// `candidate` claims to be this node's predecessor. Admitted if
    /// there's no current predecessor, `candidate` is a closer fit, or
    /// the current predecessor has gone unhealthy; `None` clears the
    /// predecessor outright (used by a node shutting down).
    async fn notify(&self, candidate: Option<PeerHandle>) -> Result<()> {
        let Some(candidate) = candidate else {
            *self.predecessor.lock().unwrap() = None;
            return Ok(());
        };

        let current = self.predecessor.lock().unwrap().clone();
        let should_admit = match &current {
            None => true,
            Some(p) => between(candidate.bucket(), p.bucket(), self.self_bucket) || {
                matches!(p.node().await, Ok(false) | Err(ChordError::NodeFailure(_)))
            },
        };

        if should_admit {
            *self.predecessor.lock().unwrap() = Some(candidate);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<GetOutcome> {
        let bucket = bucketize(key, self.config.m);
        let (owner, hops) = self.find_successor(bucket).await?;
        if owner.address() == &self.self_address {
            let value = self.storage.get(key);
            let found = value.is_some();
            Ok(GetOutcome { owner, hops, value, found })
        } else {
            owner.get(key).await
        }
    }

    async fn put(&self, key: &str, value: String, no_redirect: bool) -> Result<PutOutcome> {
        let bucket = bucketize(key, self.config.m);
        let (owner, hops) = self.find_successor(bucket).await?;
        if owner.address() == &self.self_address || no_redirect {
            self.storage.put(key, value);
            Ok(PutOutcome { owner: self.handle(), hops })
        } else {
            owner.put(key, value, false).await
        }
    }

    /// Graceful departure: hands off the predecessor pointer and every
    /// stored key to the nearest reachable successor, in successor-list
    /// order.
    async fn shutdown(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        let predecessor = self.predecessor.lock().unwrap().clone();
        let keys = self.storage.keys();

        for successor in self.successors.snapshot() {
            if successor.address() == &self.self_address {
                continue;
            }
            if successor.notify(predecessor.clone()).await.is_err() {
                continue;
            }
            let mut handed_off = true;
            for key in &keys {
                if let Some(value) = self.storage.get(key) {
                    if successor.put(key, value, true).await.is_err() {
                        handed_off = false;
                        break;
                    }
                }
            }
            if handed_off {
                info!(
                    "{} handed off {} keys to {} on shutdown",
                    self.self_address,
                    keys.len(),
                    successor.address()
                );
                return Ok(());
            }
        }

        Err(ChordError::Handoff(format!(
            "{} found no live successor to accept handoff",
            self.self_address
        )))
    }
}
