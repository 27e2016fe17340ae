//! A thread-safe, reference-counted, fan-out FIFO used to connect
//! processing nodes (demuxer, decoder, filter, encoder, muxer) in a media
//! streaming pipeline.
//!
//! [`sync::fifo`] is the core primitive; [`media`] instantiates it for
//! frames and packets, the two concrete item types a pipeline moves
//! between nodes.

pub mod error;
pub mod flags;
pub mod media;
pub mod sync;

pub use error::{FifoError, Result};
pub use flags::{string_to_block_flags, BlockFlags};
pub use media::{Frame, FrameFifo, Packet, PacketFifo};
pub use sync::fifo::{Fifo, MaxQueued};
