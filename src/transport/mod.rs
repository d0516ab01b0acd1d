//! Transport contract: send a named request to a peer by address, get a
//! typed response, or fail with [`ChordError::NodeFailure`].
//! This is the seam the peer core never reaches past — everything above
//! this trait talks in [`crate::peer::Peer`] handles, everything below it
//! talks in addresses and primitives so it can be marshalled.
//!
//! Two implementations ship in this crate: [`grpc::GrpcTransport`], the
//! networked reference encoding, and [`local::LocalTransport`], an
//! in-process registry used by the simulator and the integration tests to
//! exercise the exact same routing code without sockets.

pub mod grpc;
pub mod local;

use async_trait::async_trait;

use crate::address::Address;
use crate::error::Result;
use crate::identifier::Bucket;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Ping `target`. Fails with `NodeFailure` on connect/timeout error.
    async fn node(&self, target: &Address) -> Result<bool>;

    /// Initialize `target` as a ring of one. Fails with `State` if
    /// `target` is already initialized.
    async fn create(&self, target: &Address) -> Result<()>;

    /// Ask `target` to join the ring reachable through `bootstrap`.
    async fn join(&self, target: &Address, bootstrap: &Address) -> Result<()>;

    /// Ask `target.find_successor(key)`. `ring_bits` is the caller's own
    /// ring width; `target` rejects the call with `Protocol` if it
    /// disagrees.
    async fn find_successor(
        &self,
        target: &Address,
        key: Bucket,
        ring_bits: u32,
    ) -> Result<(Address, u32)>;

    async fn get_predecessor(&self, target: &Address) -> Result<Option<Address>>;

    async fn get_successor_list(&self, target: &Address) -> Result<Vec<Address>>;

    /// `candidate = None` asks `target` to clear its predecessor.
    async fn notify(&self, target: &Address, candidate: Option<Address>) -> Result<()>;

    async fn shutdown(&self, target: &Address) -> Result<()>;

    async fn get_key(&self, target: &Address, key: &str) -> Result<(Address, u32, Option<String>, bool)>;

    async fn put_key(
        &self,
        target: &Address,
        key: &str,
        value: &str,
        no_redirect: bool,
    ) -> Result<(Address, u32)>;
}
