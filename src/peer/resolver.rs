use std::sync::{Arc, Weak};

use super::{Peer, PeerHandle, RemotePeer};
use crate::address::Address;
use crate::transport::Transport;

/// Turns an [`Address`] coming back over the wire into a [`PeerHandle`]:
/// the local peer's own address resolves to its own handle (no network
/// round trip needed to talk to yourself), every other address becomes a
/// fresh [`RemotePeer`] sharing this node's transport.
///
/// Cheap to clone: an `Address`, a `Weak`, and an `Arc` clone.
#[derive(Clone)]
pub struct PeerResolver {
    self_address: Address,
    self_handle: Weak<dyn Peer>,
    transport: Arc<dyn Transport>,
    ring_bits: u32,
}

impl PeerResolver {
    /// `self_handle` is filled in after construction, once the owning
    /// `LocalPeer`'s `Arc` exists (see `LocalPeer::new`, which uses
    /// `Arc::new_cyclic` for exactly this reason).
    pub(crate) fn new(
        self_address: Address,
        self_handle: Weak<dyn Peer>,
        transport: Arc<dyn Transport>,
        ring_bits: u32,
    ) -> Self {
        PeerResolver {
            self_address,
            self_handle,
            transport,
            ring_bits,
        }
    }

    pub fn ring_bits(&self) -> u32 {
        self.ring_bits
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn resolve(&self, address: &Address) -> PeerHandle {
        if *address == self.self_address {
            self.self_handle
                .upgrade()
                .expect("local peer resolved after it was dropped")
        } else {
            Arc::new(RemotePeer::new(
                address.clone(),
                self.ring_bits,
                self.clone(),
            ))
        }
    }
}
