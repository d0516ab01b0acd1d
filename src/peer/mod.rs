//! Handle polymorphism: local and remote peers share one capability
//! surface. `Peer` is that shared surface; `LocalPeer`
//! owns state and storage, `RemotePeer` relays everything through a
//! [`crate::transport::Transport`]. Operations that only make sense
//! locally — `create`, `join`, and the three maintenance steps — are
//! deliberately left off this trait; calling them on a remote handle isn't
//! expressible, only `LocalPeer` has them.

mod local;
mod remote;
mod resolver;

pub use local::LocalPeer;
pub use remote::RemotePeer;
pub use resolver::PeerResolver;

use std::sync::Arc;

use async_trait::async_trait;

use crate::address::Address;
use crate::error::Result;
use crate::identifier::Bucket;

/// A handle to a peer, local or remote. Cheap to clone (it's an `Arc`).
pub type PeerHandle = Arc<dyn Peer>;

/// Outcome of a `get`: who answered, how many hops it took to get there,
/// and what was found.
#[derive(Debug, Clone)]
pub struct GetOutcome {
    pub owner: PeerHandle,
    pub hops: u32,
    pub value: Option<String>,
    pub found: bool,
}

/// Outcome of a `put`: who stored it and how many hops it took.
#[derive(Debug, Clone)]
pub struct PutOutcome {
    pub owner: PeerHandle,
    pub hops: u32,
}

impl std::fmt::Debug for dyn Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Peer({})", self.address())
    }
}

/// The capability shared by every peer in the ring, local or remote.
///
/// Hop counting: the originating peer's own local resolution costs zero
/// hops; each cross-peer forward adds one.
#[async_trait]
pub trait Peer: Send + Sync {
    /// This peer's address. Never blocks.
    fn address(&self) -> &Address;

    /// This peer's bucket on the ring. Never blocks.
    fn bucket(&self) -> Bucket;

    /// Ping. `Err(NodeFailure)` when unreachable; `Ok(false)` when reachable
    /// but reporting itself not alive (the wire `is_alive` field — reserved
    /// for callers that need to distinguish the two explicitly; in-process
    /// peers never answer `Ok(false)`).
    async fn node(&self) -> Result<bool>;

    /// Finger-accelerated successor lookup. Returns the owner and the
    /// number of remote forwarding hops taken to find it.
    async fn find_successor(&self, key: Bucket) -> Result<(PeerHandle, u32)>;

    /// This peer's current predecessor, if any.
    async fn get_predecessor(&self) -> Result<Option<PeerHandle>>;

    /// This peer's current successor list, primary first.
    async fn get_successor_list(&self) -> Result<Vec<PeerHandle>>;

    /// Tell this peer that `candidate` thinks it might be its predecessor.
    /// `None` clears the predecessor (used by a shutting-down node).
    async fn notify(&self, candidate: Option<PeerHandle>) -> Result<()>;

    /// Routed read: resolves the owner via `find_successor`, then answers
    /// from storage (if the owner is this peer) or forwards.
    async fn get(&self, key: &str) -> Result<GetOutcome>;

    /// Routed write: resolves the owner via `find_successor` unless
    /// `no_redirect` is set, in which case this peer writes locally
    /// regardless of whether it is the rightful owner (used by shutdown
    /// handoff).
    async fn put(&self, key: &str, value: String, no_redirect: bool) -> Result<PutOutcome>;

    /// Graceful departure: hand off the predecessor pointer and stored
    /// keys to the nearest reachable successor.
    async fn shutdown(&self) -> Result<()>;
}
