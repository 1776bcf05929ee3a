// src/acquisition/decoder.rs
//! Chunk decoder: raw per-channel driver buffers to typed columns

use crate::acquisition::channel_types::ChannelType;
use crate::acquisition::chunk::{ChannelData, Chunk};
use std::mem::size_of;
use thiserror::Error;

/// Reasons a streaming delivery cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("channel {channel} has unknown type tag {tag}")]
    UnknownTag { channel: usize, tag: u8 },

    #[error("channel {channel} buffer holds {actual} bytes, {expected} required")]
    Truncated {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    #[error("channel {channel} cannot hold {count} samples")]
    CountOverflow { channel: usize, count: usize },

    #[error("stream announces {expected} channels but {actual} buffers were delivered")]
    ChannelCountMismatch { expected: usize, actual: usize },
}

/// Decode one delivery given the raw tag list reported by the driver
pub fn decode_tagged(tags: &[u8], buffers: &[&[u8]], count: usize) -> Result<Chunk, DecodeError> {
    let types = ChannelType::resolve(tags)?;
    decode_chunk(&types, buffers, count)
}

/// Decode one delivery.
///
/// Each buffer is an independent column of `count` samples encoded per its
/// channel type. Surplus bytes past `count` samples are ignored.
pub fn decode_chunk(
    types: &[ChannelType],
    buffers: &[&[u8]],
    count: usize,
) -> Result<Chunk, DecodeError> {
    if types.len() != buffers.len() {
        return Err(DecodeError::ChannelCountMismatch {
            expected: types.len(),
            actual: buffers.len(),
        });
    }

    let channels = types
        .iter()
        .zip(buffers)
        .enumerate()
        .map(|(channel, (&ty, raw))| decode_column(channel, ty, raw, count))
        .collect::<Result<Vec<_>, _>>()?;

    // every column was cut to exactly `count` samples
    Ok(Chunk::from_columns(channels, count))
}

fn decode_column(
    channel: usize,
    ty: ChannelType,
    raw: &[u8],
    count: usize,
) -> Result<ChannelData, DecodeError> {
    let expected = ty
        .width()
        .checked_mul(count)
        .ok_or(DecodeError::CountOverflow { channel, count })?;
    if raw.len() < expected {
        return Err(DecodeError::Truncated {
            channel,
            expected,
            actual: raw.len(),
        });
    }
    let raw = &raw[..expected];

    let data = match ty {
        ChannelType::Float => ChannelData::Float(
            raw.chunks_exact(size_of::<f32>())
                .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        ),
        ChannelType::Bool => ChannelData::Bool(raw.iter().map(|&b| b != 0).collect()),
        ChannelType::Count => ChannelData::Count(
            raw.chunks_exact(size_of::<usize>())
                .map(|b| {
                    let mut word = [0u8; size_of::<usize>()];
                    word.copy_from_slice(b);
                    usize::from_ne_bytes(word) as u64
                })
                .collect(),
        ),
        ChannelType::Double => ChannelData::Double(
            raw.chunks_exact(size_of::<f64>())
                .map(|b| {
                    let mut word = [0u8; size_of::<f64>()];
                    word.copy_from_slice(b);
                    f64::from_ne_bytes(word)
                })
                .collect(),
        ),
    };
    Ok(data)
}
