//! Networked transport: a pooled `tonic` client plus the server-side
//! `chord_proto::chord_server::Chord` adapter that dispatches inbound
//! calls to a [`LocalPeer`]. gRPC/protobuf over `tonic`/`prost` is this
//! crate's wire encoding.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::info;
use tonic::transport::Channel;
use tonic::{Request, Response, Status};

use crate::address::Address;
use crate::error::{ChordError, Result};
use crate::identifier::Bucket;
use crate::peer::LocalPeer;

use super::Transport;

pub mod chord_proto {
    tonic::include_proto!("chord");

    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("chord_descriptor");
}

use chord_proto::chord_client::ChordClient;
use chord_proto::chord_server::Chord;
use chord_proto::{
    Empty, FindSuccessorRequest, FindSuccessorResponse, GetKeyRequest, GetKeyResponse,
    GetPredecessorResponse, GetSuccessorListResponse, JoinRequest, NodeResponse, NotifyRequest,
    PutKeyRequest, PutKeyResponse,
};

/// Pooled client transport. Connections are cached per address; every
/// failure path threads the target address through so `NodeFailure`
/// always names the peer that was actually unreachable.
pub struct GrpcTransport {
    pool: Mutex<HashMap<Address, ChordClient<Channel>>>,
}

impl GrpcTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(GrpcTransport { pool: Mutex::new(HashMap::new()) })
    }

    async fn client(&self, target: &Address) -> Result<ChordClient<Channel>> {
        if let Some(client) = self.pool.lock().unwrap().get(target) {
            return Ok(client.clone());
        }
        let endpoint = format!("http://{target}");
        let client = ChordClient::connect(endpoint)
            .await
            .map_err(|e| ChordError::from_connect_error(target, e))?;
        self.pool.lock().unwrap().insert(target.clone(), client.clone());
        Ok(client)
    }

    /// Drops a cached connection so the next call reconnects. Called when
    /// a request against `target` fails — a stale pooled channel should
    /// not poison every future attempt to reach that address.
    fn evict(&self, target: &Address) {
        self.pool.lock().unwrap().remove(target);
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    async fn node(&self, target: &Address) -> Result<bool> {
        let mut client = self.client(target).await?;
        match client.node(Request::new(Empty {})).await {
            Ok(resp) => Ok(resp.into_inner().is_alive),
            Err(status) => {
                self.evict(target);
                Err(status.into())
            }
        }
    }

    async fn create(&self, target: &Address) -> Result<()> {
        let mut client = self.client(target).await?;
        client.create(Request::new(Empty {})).await.map_err(|s| {
            self.evict(target);
            ChordError::from_status(target, s)
        })?;
        Ok(())
    }

    async fn join(&self, target: &Address, bootstrap: &Address) -> Result<()> {
        let mut client = self.client(target).await?;
        client
            .join(Request::new(JoinRequest { bootstrap_address: bootstrap.to_string() }))
            .await
            .map_err(|s| {
                self.evict(target);
                ChordError::from_status(target, s)
            })?;
        Ok(())
    }

    async fn find_successor(
        &self,
        target: &Address,
        key: Bucket,
        ring_bits: u32,
    ) -> Result<(Address, u32)> {
        let mut client = self.client(target).await?;
        let resp = client
            .find_successor(Request::new(FindSuccessorRequest { key, ring_bits }))
            .await
            .map_err(|s| {
                self.evict(target);
                ChordError::from_status(target, s)
            })?
            .into_inner();
        Ok((Address::new(resp.owner_address), resp.hops))
    }

    async fn get_predecessor(&self, target: &Address) -> Result<Option<Address>> {
        let mut client = self.client(target).await?;
        let resp = client
            .get_predecessor(Request::new(Empty {}))
            .await
            .map_err(|s| {
                self.evict(target);
                ChordError::from_status(target, s)
            })?
            .into_inner();
        Ok(resp.address.map(Address::new))
    }

    async fn get_successor_list(&self, target: &Address) -> Result<Vec<Address>> {
        let mut client = self.client(target).await?;
        let resp = client
            .get_successor_list(Request::new(Empty {}))
            .await
            .map_err(|s| {
                self.evict(target);
                ChordError::from_status(target, s)
            })?
            .into_inner();
        Ok(resp.addresses.into_iter().map(Address::new).collect())
    }

    async fn notify(&self, target: &Address, candidate: Option<Address>) -> Result<()> {
        let mut client = self.client(target).await?;
        client
            .notify(Request::new(NotifyRequest {
                candidate_address: candidate.map(|a| a.to_string()),
            }))
            .await
            .map_err(|s| {
                self.evict(target);
                ChordError::from_status(target, s)
            })?;
        Ok(())
    }

    async fn shutdown(&self, target: &Address) -> Result<()> {
        let mut client = self.client(target).await?;
        client.shutdown(Request::new(Empty {})).await.map_err(|s| {
            self.evict(target);
            ChordError::from_status(target, s)
        })?;
        self.evict(target);
        Ok(())
    }

    async fn get_key(
        &self,
        target: &Address,
        key: &str,
    ) -> Result<(Address, u32, Option<String>, bool)> {
        let mut client = self.client(target).await?;
        let resp = client
            .get_key(Request::new(GetKeyRequest { key: key.to_string() }))
            .await
            .map_err(|s| {
                self.evict(target);
                ChordError::from_status(target, s)
            })?
            .into_inner();
        Ok((Address::new(resp.owner_address), resp.hops, resp.value, resp.found))
    }

    async fn put_key(
        &self,
        target: &Address,
        key: &str,
        value: &str,
        no_redirect: bool,
    ) -> Result<(Address, u32)> {
        let mut client = self.client(target).await?;
        let resp = client
            .put_key(Request::new(PutKeyRequest {
                key: key.to_string(),
                value: value.to_string(),
                no_redirect,
            }))
            .await
            .map_err(|s| {
                self.evict(target);
                ChordError::from_status(target, s)
            })?
            .into_inner();
        Ok((Address::new(resp.owner_address), resp.hops))
    }
}

/// Server-side adapter: dispatches inbound gRPC calls to the node's own
/// [`LocalPeer`]. One instance is registered per running `chord-server`.
pub struct ChordGrpcService {
    peer: Arc<LocalPeer>,
}

impl ChordGrpcService {
    pub fn new(peer: Arc<LocalPeer>) -> Self {
        ChordGrpcService { peer }
    }
}

#[tonic::async_trait]
impl Chord for ChordGrpcService {
    async fn node(&self, _request: Request<Empty>) -> std::result::Result<Response<NodeResponse>, Status> {
        use crate::peer::Peer;
        let is_alive = self.peer.node().await.map_err(Status::from)?;
        Ok(Response::new(NodeResponse { is_alive }))
    }

    async fn create(&self, _request: Request<Empty>) -> std::result::Result<Response<Empty>, Status> {
        self.peer.create().await.map_err(Status::from)?;
        Ok(Response::new(Empty {}))
    }

    async fn join(
        &self,
        request: Request<JoinRequest>,
    ) -> std::result::Result<Response<Empty>, Status> {
        let bootstrap = Address::new(request.into_inner().bootstrap_address);
        let bootstrap_handle = self.peer.resolve(&bootstrap);
        self.peer.join(bootstrap_handle).await.map_err(Status::from)?;
        Ok(Response::new(Empty {}))
    }

    async fn find_successor(
        &self,
        request: Request<FindSuccessorRequest>,
    ) -> std::result::Result<Response<FindSuccessorResponse>, Status> {
        use crate::peer::Peer;
        let req = request.into_inner();
        if req.ring_bits != self.peer.ring_bits() {
            return Err(Status::invalid_argument(format!(
                "ring size mismatch: caller uses m={}, this node uses m={}",
                req.ring_bits,
                self.peer.ring_bits()
            )));
        }
        let (owner, hops) = self.peer.find_successor(req.key).await.map_err(Status::from)?;
        Ok(Response::new(FindSuccessorResponse {
            owner_address: owner.address().to_string(),
            hops,
        }))
    }

    async fn get_predecessor(
        &self,
        _request: Request<Empty>,
    ) -> std::result::Result<Response<GetPredecessorResponse>, Status> {
        use crate::peer::Peer;
        let predecessor = self.peer.get_predecessor().await.map_err(Status::from)?;
        Ok(Response::new(GetPredecessorResponse {
            address: predecessor.map(|p| p.address().to_string()),
        }))
    }

    async fn get_successor_list(
        &self,
        _request: Request<Empty>,
    ) -> std::result::Result<Response<GetSuccessorListResponse>, Status> {
        use crate::peer::Peer;
        let list = self.peer.get_successor_list().await.map_err(Status::from)?;
        Ok(Response::new(GetSuccessorListResponse {
            addresses: list.iter().map(|p| p.address().to_string()).collect(),
        }))
    }

    async fn notify(
        &self,
        request: Request<NotifyRequest>,
    ) -> std::result::Result<Response<Empty>, Status> {
        use crate::peer::Peer;
        let candidate_address = request.into_inner().candidate_address;
        let candidate = candidate_address.map(|addr| self.peer.resolve(&Address::new(addr)));
        self.peer.notify(candidate).await.map_err(Status::from)?;
        Ok(Response::new(Empty {}))
    }

    async fn shutdown(&self, _request: Request<Empty>) -> std::result::Result<Response<Empty>, Status> {
        use crate::peer::Peer;
        info!("{} shutting down on remote request", self.peer.address());
        self.peer.shutdown().await.map_err(Status::from)?;
        Ok(Response::new(Empty {}))
    }

    async fn get_key(
        &self,
        request: Request<GetKeyRequest>,
    ) -> std::result::Result<Response<GetKeyResponse>, Status> {
        use crate::peer::Peer;
        let key = request.into_inner().key;
        let outcome = self.peer.get(&key).await.map_err(Status::from)?;
        Ok(Response::new(GetKeyResponse {
            owner_address: outcome.owner.address().to_string(),
            hops: outcome.hops,
            value: outcome.value,
            found: outcome.found,
        }))
    }

    async fn put_key(
        &self,
        request: Request<PutKeyRequest>,
    ) -> std::result::Result<Response<PutKeyResponse>, Status> {
        use crate::peer::Peer;
        let req = request.into_inner();
        let outcome = self
            .peer
            .put(&req.key, req.value, req.no_redirect)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(PutKeyResponse {
            owner_address: outcome.owner.address().to_string(),
            hops: outcome.hops,
        }))
    }
}
