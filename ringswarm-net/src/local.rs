//! In-process process group
//!
//! `LocalGroup` wires `size` endpoints together with unbounded tokio
//! channels (one inbox per rank) and a shared barrier, so an SPMD program can
//! run every rank as a task inside one process. Frames travel as serialized
//! [`MessageEnvelope`]s, exactly as they would over a socket.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Barrier, Mutex};
use tokio::task::JoinSet;

use crate::protocol::{MessageEnvelope, Tag};
use crate::traits::Communicator;
use crate::{Error, Result};

/// Factory for in-process groups
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalGroup;

/// One rank's handle on a [`LocalGroup`]
#[derive(Debug)]
pub struct LocalEndpoint {
    rank: usize,
    peers: Arc<[UnboundedSender<Vec<u8>>]>,
    inbox: Mutex<Inbox>,
    barrier: Arc<Barrier>,
}

#[derive(Debug)]
struct Inbox {
    rx: UnboundedReceiver<Vec<u8>>,
    /// Frames that arrived before a matching receive was posted
    pending: VecDeque<MessageEnvelope>,
}

impl Inbox {
    fn take_pending(&mut self, source: usize, tag: Tag) -> Option<MessageEnvelope> {
        let idx = self.pending.iter().position(|e| e.matches(source, tag))?;
        self.pending.remove(idx)
    }
}

impl LocalGroup {
    /// Create the endpoints of a group of `size` ranks, in rank order.
    pub fn endpoints(size: usize) -> Result<Vec<LocalEndpoint>> {
        if size == 0 {
            return Err(Error::PeerNotFound { rank: 0, size: 0 });
        }
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded_channel()).unzip();
        let peers: Arc<[UnboundedSender<Vec<u8>>]> = senders.into();
        let barrier = Arc::new(Barrier::new(size));

        Ok(receivers
            .into_iter()
            .enumerate()
            .map(|(rank, rx)| LocalEndpoint {
                rank,
                peers: Arc::clone(&peers),
                inbox: Mutex::new(Inbox {
                    rx,
                    pending: VecDeque::new(),
                }),
                barrier: Arc::clone(&barrier),
            })
            .collect())
    }

    /// Run `body` once per rank as concurrent tokio tasks.
    ///
    /// Results are returned in rank order. The first rank to fail ends the
    /// run: its error is returned and the remaining ranks are aborted, since
    /// they may be parked on a receive or barrier that will never complete.
    /// A panicking rank yields `TaskFailed`.
    pub async fn run<F, Fut, R, E>(size: usize, body: F) -> core::result::Result<Vec<R>, E>
    where
        F: Fn(LocalEndpoint) -> Fut,
        Fut: Future<Output = core::result::Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: From<Error> + Send + 'static,
    {
        let mut tasks = JoinSet::new();
        let mut ranks = HashMap::with_capacity(size);
        for (rank, endpoint) in Self::endpoints(size)?.into_iter().enumerate() {
            let member = body(endpoint);
            let handle = tasks.spawn(async move { (rank, member.await) });
            ranks.insert(handle.id(), rank);
        }

        let mut slots: Vec<Option<R>> = (0..size).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((rank, Ok(value))) => slots[rank] = Some(value),
                Ok((rank, Err(e))) => {
                    tracing::warn!(rank, remaining = tasks.len(), "group member failed, aborting the group");
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    let rank = ranks.get(&e.id()).copied().unwrap_or(usize::MAX);
                    tracing::error!(rank, error = %e, "group member task failed");
                    tasks.abort_all();
                    return Err(Error::TaskFailed { rank }.into());
                }
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(rank, slot)| slot.ok_or_else(|| E::from(Error::TaskFailed { rank })))
            .collect()
    }
}

impl LocalEndpoint {
    fn check_peer(&self, rank: usize) -> Result<()> {
        if rank >= self.peers.len() {
            return Err(Error::PeerNotFound {
                rank,
                size: self.peers.len(),
            });
        }
        Ok(())
    }
}

fn check_round(envelope: &MessageEnvelope, round: u64) -> Result<()> {
    if envelope.round != round {
        return Err(Error::OutOfOrder {
            source: envelope.source as usize,
            expected: round,
            got: envelope.round,
        });
    }
    Ok(())
}

#[async_trait::async_trait]
impl Communicator for LocalEndpoint {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    async fn send_frame(&self, dest: usize, tag: Tag, round: u64, payload: Vec<u8>) -> Result<()> {
        self.check_peer(dest)?;
        let frame = MessageEnvelope::new(self.rank, tag, round, payload).serialize()?;
        self.peers[dest]
            .send(frame)
            .map_err(|_| Error::SendFailed { dest })
    }

    async fn recv_frame(&self, source: usize, tag: Tag, round: u64) -> Result<Vec<u8>> {
        self.check_peer(source)?;
        let mut inbox = self.inbox.lock().await;

        if let Some(envelope) = inbox.take_pending(source, tag) {
            check_round(&envelope, round)?;
            return Ok(envelope.payload);
        }

        loop {
            let frame = inbox
                .rx
                .recv()
                .await
                .ok_or(Error::ReceiveFailed { source })?;
            let envelope = MessageEnvelope::deserialize(&frame)?;
            if envelope.matches(source, tag) {
                check_round(&envelope, round)?;
                return Ok(envelope.payload);
            }
            inbox.pending.push_back(envelope);
        }
    }

    async fn barrier(&self) -> Result<()> {
        self.barrier.wait().await;
        Ok(())
    }
}
