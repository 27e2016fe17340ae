//! Minimal stand-ins for the surrounding media library's item types.
//!
//! The FIFO core only needs `T: Clone`; everything else about frames and
//! packets (demuxing, decoding, codec parameters, ...) belongs to that
//! external library, not here.

use std::sync::Arc;

use crate::sync::fifo::Fifo;

/// A decoded, uncompressed media sample.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pts: i64,
    pub samples: Box<[f32]>,
}

/// An encoded, compressed media sample.
#[derive(Debug, Clone)]
pub struct Packet {
    pub pts: i64,
    pub data: Box<[u8]>,
}

/// A FIFO carrying decoded frames between pipeline nodes.
pub type FrameFifo = Fifo<Arc<Frame>>;

/// A FIFO carrying encoded packets between pipeline nodes.
pub type PacketFifo = Fifo<Arc<Packet>>;
