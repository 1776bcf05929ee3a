// src/acquisition/channel_types.rs
//! Channel type registry: stream type tags to decoding rules

use crate::acquisition::decoder::DecodeError;
use serde::{Deserialize, Serialize};
use std::mem::size_of;

/// Encoding of one stream column, as announced by the driver's type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    /// 32-bit float measurement (tag 0)
    Float,
    /// One-byte flag, non-zero is true (tag 1)
    Bool,
    /// Native `size_t` counter such as the sample number (tag 2)
    Count,
    /// 64-bit float value (tag 3)
    Double,
}

impl ChannelType {
    /// Look up the decoding rule for a driver tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ChannelType::Float),
            1 => Some(ChannelType::Bool),
            2 => Some(ChannelType::Count),
            3 => Some(ChannelType::Double),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            ChannelType::Float => 0,
            ChannelType::Bool => 1,
            ChannelType::Count => 2,
            ChannelType::Double => 3,
        }
    }

    /// Bytes occupied by one sample
    pub fn width(self) -> usize {
        match self {
            ChannelType::Float => size_of::<f32>(),
            ChannelType::Bool => 1,
            ChannelType::Count => size_of::<usize>(),
            ChannelType::Double => size_of::<f64>(),
        }
    }

    /// Resolve a full tag list, failing on the first unknown tag
    pub fn resolve(tags: &[u8]) -> Result<Vec<ChannelType>, DecodeError> {
        tags.iter()
            .enumerate()
            .map(|(channel, &tag)| {
                ChannelType::from_tag(tag).ok_or(DecodeError::UnknownTag { channel, tag })
            })
            .collect()
    }
}
