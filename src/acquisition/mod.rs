// src/acquisition/mod.rs
//! Chunk decoding and sample buffering
//!
//! Raw per-channel byte buffers delivered by the driver are decoded into a
//! [`Chunk`], appended to an [`AcquisitionBuffer`] and read back as
//! [`Recording`] snapshots.

pub mod accumulator;
pub mod buffer_manager;
pub mod channel_types;
pub mod chunk;
pub mod decoder;
pub mod ring_buffer;

#[cfg(feature = "desktop")]
pub mod controller;

pub use accumulator::Accumulator;
pub use buffer_manager::{
    AcquisitionBuffer, BufferError, BufferMode, Recording, SampleStore, SnapshotAnnotation, Window,
};
pub use channel_types::ChannelType;
pub use chunk::{ChannelData, Chunk};
pub use decoder::{decode_chunk, decode_tagged, DecodeError};
pub use ring_buffer::RollingWindow;

#[cfg(feature = "desktop")]
pub use controller::Acquisition;
