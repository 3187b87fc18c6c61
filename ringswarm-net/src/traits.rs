//! Communicator traits
//!
//! A communicator is one rank's handle on a fixed, statically sized process
//! group. Sends and receives are point-to-point and blocking in the SPMD
//! sense: a receive suspends until the matching message has arrived, a
//! barrier suspends until every rank has reached it. There are no timeouts.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::protocol::{decode, encode, Tag};
use crate::Result;

/// Ranked point-to-point transport for one member of a process group
#[async_trait::async_trait]
pub trait Communicator: Send + Sync {
    /// This member's rank in `0..size()`
    fn rank(&self) -> usize;

    /// Number of members in the group
    fn size(&self) -> usize;

    /// Send an encoded payload to `dest`
    async fn send_frame(&self, dest: usize, tag: Tag, round: u64, payload: Vec<u8>) -> Result<()>;

    /// Receive the next payload from `source` carrying `tag`.
    ///
    /// Fails with `OutOfOrder` when that message belongs to another round.
    async fn recv_frame(&self, source: usize, tag: Tag, round: u64) -> Result<Vec<u8>>;

    /// Wait until every member of the group has reached the barrier
    async fn barrier(&self) -> Result<()>;
}

/// Typed send/receive on top of any [`Communicator`]
#[async_trait::async_trait]
pub trait CommunicatorExt: Communicator {
    /// Encode and send a value
    async fn send<V>(&self, dest: usize, tag: Tag, round: u64, value: &V) -> Result<()>
    where
        V: Serialize + Sync + ?Sized,
    {
        let payload = encode(value)?;
        self.send_frame(dest, tag, round, payload).await
    }

    /// Receive and decode a value
    async fn recv<V>(&self, source: usize, tag: Tag, round: u64) -> Result<V>
    where
        V: DeserializeOwned + Send,
    {
        let payload = self.recv_frame(source, tag, round).await?;
        decode(&payload)
    }
}

impl<C: Communicator + ?Sized> CommunicatorExt for C {}
