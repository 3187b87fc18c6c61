//! Message protocol and framing
//!
//! This module defines the wire format for group messages. Every payload is
//! postcard-encoded and wrapped in a [`MessageEnvelope`] that names the
//! sending rank, the protocol step (`Tag`) and the round it belongs to.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Message envelope for all group communications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Protocol version (major, minor)
    pub version: (u8, u8),
    /// Protocol step discriminator
    pub tag: Tag,
    /// Sending rank
    pub source: u32,
    /// Round within the protocol (e.g. logical index of the ring step)
    pub round: u64,
    /// Payload bytes
    pub payload: Vec<u8>,
}

impl MessageEnvelope {
    /// Current protocol version
    pub const CURRENT_VERSION: (u8, u8) = (0, 1);

    /// Create a new message envelope
    pub fn new(source: usize, tag: Tag, round: u64, payload: Vec<u8>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            tag,
            source: source as u32,
            round,
            payload,
        }
    }

    /// Serialize the envelope to bytes
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// Deserialize from bytes, rejecting unknown major versions
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let envelope: Self = postcard::from_bytes(bytes)?;
        if envelope.version.0 != Self::CURRENT_VERSION.0 {
            return Err(Error::InvalidMessage {
                version: envelope.version,
            });
        }
        Ok(envelope)
    }

    /// Whether this envelope answers a receive posted for `source`/`tag`
    pub fn matches(&self, source: usize, tag: Tag) -> bool {
        self.source as usize == source && self.tag == tag
    }
}

/// Protocol step discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tag {
    /// Personal-best fitness of a ring neighbor
    NeighborFitness = 0x01,
    /// Winner of a ring neighborhood, sent to the neighbors' owners
    NeighborWinner = 0x02,
    /// Personal-best position and fitness of a neighborhood winner
    NeighborBest = 0x03,
    /// Scalar score gathered at the coordinator
    GatherScore = 0x10,
    /// Winning logical index broadcast by the coordinator
    WinnerIndex = 0x11,
    /// Full fitness vector of the final winner
    WinnerFitness = 0x12,
    /// Averaged scalar fitness of the final winner
    WinnerScore = 0x13,
    /// Position of the final winner, sent to the coordinator
    Solution = 0x14,
    /// Test and diagnostic traffic
    Probe = 0xFE,
}

/// Encode a payload value
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(postcard::to_allocvec(value)?)
}

/// Decode a payload value
pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    Ok(postcard::from_bytes(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_survives_framing() {
        let payload = encode(&[0.25f64, -1.5]).unwrap();
        let envelope = MessageEnvelope::new(3, Tag::NeighborBest, 17, payload);
        let bytes = envelope.serialize().unwrap();
        let back = MessageEnvelope::deserialize(&bytes).unwrap();
        assert_eq!(back, envelope);
        assert!(back.matches(3, Tag::NeighborBest));
        assert!(!back.matches(3, Tag::NeighborFitness));
        let values: Vec<f64> = decode(&back.payload).unwrap();
        assert_eq!(values, vec![0.25, -1.5]);
    }

    #[test]
    fn unknown_major_version_is_rejected() {
        let mut envelope = MessageEnvelope::new(0, Tag::Probe, 0, vec![]);
        envelope.version = (9, 0);
        let bytes = envelope.serialize().unwrap();
        assert!(matches!(
            MessageEnvelope::deserialize(&bytes),
            Err(Error::InvalidMessage { version: (9, 0) })
        ));
    }

    #[test]
    fn truncated_frame_is_a_serialization_error() {
        let envelope = MessageEnvelope::new(1, Tag::GatherScore, 2, encode(&1.0f64).unwrap());
        let bytes = envelope.serialize().unwrap();
        assert!(matches!(
            MessageEnvelope::deserialize(&bytes[..bytes.len() - 3]),
            Err(Error::Serialization(_))
        ));
    }
}
