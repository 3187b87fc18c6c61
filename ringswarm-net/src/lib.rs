//! # RingSwarm Network
//!
//! Message transport abstractions for RingSwarm process groups.
//!
//! This crate provides:
//! - The `Communicator` trait: ranked point-to-point send/receive plus a
//!   full-group barrier
//! - The `MessageEnvelope` wire format (postcard framing, tag and round)
//! - `LocalGroup`, an in-process group of communicators backed by tokio
//!   channels, for running a whole SPMD group inside one process
//!
//! ## Feature Flags
//!
//! - `local-transport` (default): Enable the in-process `LocalGroup`

#![forbid(unsafe_code)]

pub mod protocol;
pub mod traits;

#[cfg(feature = "local-transport")]
mod local;
#[cfg(feature = "local-transport")]
pub use local::{LocalEndpoint, LocalGroup};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::protocol::*;
    pub use crate::traits::*;
}

/// Result type for network operations
pub type Result<T> = core::result::Result<T, Error>;

/// Network error types
#[derive(Debug)]
pub enum Error {
    /// Destination or source rank is not part of the group
    PeerNotFound { rank: usize, size: usize },
    /// Send failed because the receiving side is gone
    SendFailed { dest: usize },
    /// Receive failed because every sender is gone
    ReceiveFailed { source: usize },
    /// A message arrived for a different protocol round than expected
    OutOfOrder {
        source: usize,
        expected: u64,
        got: u64,
    },
    /// Frame or payload could not be encoded/decoded
    Serialization(postcard::Error),
    /// Unsupported envelope version
    InvalidMessage { version: (u8, u8) },
    /// Barrier could not be completed
    BarrierFailed,
    /// A group member task panicked or was cancelled
    TaskFailed { rank: usize },
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::PeerNotFound { rank, size } => {
                write!(f, "peer rank {rank} not found in group of {size}")
            }
            Error::SendFailed { dest } => write!(f, "send to rank {dest} failed"),
            Error::ReceiveFailed { source } => write!(f, "receive from rank {source} failed"),
            Error::OutOfOrder {
                source,
                expected,
                got,
            } => write!(
                f,
                "out-of-order message from rank {source}: expected round {expected}, got {got}"
            ),
            Error::Serialization(e) => write!(f, "serialization error: {e}"),
            Error::InvalidMessage { version } => {
                write!(f, "invalid message format: version {}.{}", version.0, version.1)
            }
            Error::BarrierFailed => write!(f, "barrier failed"),
            Error::TaskFailed { rank } => write!(f, "group member {rank} failed"),
        }
    }
}

impl From<postcard::Error> for Error {
    fn from(e: postcard::Error) -> Self {
        Error::Serialization(e)
    }
}
