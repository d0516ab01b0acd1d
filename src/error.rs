//! Node-failure is advisory and recovered locally inside lookup, stabilize
//! and shutdown; the rest bubble to the RPC boundary.

use thiserror::Error;

use crate::address::Address;

#[derive(Debug, Error, Clone)]
pub enum ChordError {
    /// A remote call could not be completed: connect error, timeout, or a
    /// server-side fault that this crate chooses to treat the same way so
    /// routing stays robust. Advisory — callers fall back to the next
    /// candidate, they never blacklist the peer.
    #[error("peer {0} did not respond")]
    NodeFailure(Address),

    /// A response did not match the expected schema.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Programmer error: double `create`/`join`, or `find_successor`
    /// exhausting every candidate without reaching the `self` sentinel.
    #[error("invalid state: {0}")]
    State(String),

    /// Shutdown handoff found no live successor to accept the departing
    /// node's keys.
    #[error("handoff failed: {0}")]
    Handoff(String),
}

impl ChordError {
    /// Maps a failed RPC to a typed error. `target` is the peer that was
    /// actually being called — `NodeFailure` needs the real address, not
    /// the status message text, since callers match on it to pick the next
    /// routing candidate.
    ///
    /// `Unavailable`/`DeadlineExceeded`/`Cancelled` are connectivity
    /// problems and map to `NodeFailure` so lookup/stabilize/shutdown can
    /// retry the next candidate without special-casing gRPC. Everything
    /// else is a schema or application-level fault.
    pub fn from_status(target: &Address, status: tonic::Status) -> Self {
        use tonic::Code;
        match status.code() {
            Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled | Code::Aborted => {
                ChordError::NodeFailure(target.clone())
            }
            Code::InvalidArgument | Code::NotFound | Code::FailedPrecondition => {
                ChordError::Protocol(status.message().to_string())
            }
            _ => ChordError::State(status.message().to_string()),
        }
    }

    /// A connection to `target` could not even be established.
    pub fn from_connect_error(target: &Address, _err: tonic::transport::Error) -> Self {
        ChordError::NodeFailure(target.clone())
    }
}

impl From<ChordError> for tonic::Status {
    fn from(err: ChordError) -> Self {
        match err {
            ChordError::NodeFailure(addr) => {
                tonic::Status::unavailable(format!("peer {addr} did not respond"))
            }
            ChordError::Protocol(msg) => tonic::Status::invalid_argument(msg),
            ChordError::State(msg) => tonic::Status::failed_precondition(msg),
            ChordError::Handoff(msg) => tonic::Status::internal(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChordError>;
