// src/acquisition/chunk.rs
//! Decoded multi-channel chunks

use crate::acquisition::channel_types::ChannelType;
use ndarray::Array2;

/// One decoded column of a chunk
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData {
    Float(Vec<f32>),
    Bool(Vec<bool>),
    Count(Vec<u64>),
    Double(Vec<f64>),
}

impl ChannelData {
    pub fn len(&self) -> usize {
        match self {
            ChannelData::Float(values) => values.len(),
            ChannelData::Bool(values) => values.len(),
            ChannelData::Count(values) => values.len(),
            ChannelData::Double(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel_type(&self) -> ChannelType {
        match self {
            ChannelData::Float(_) => ChannelType::Float,
            ChannelData::Bool(_) => ChannelType::Bool,
            ChannelData::Count(_) => ChannelType::Count,
            ChannelData::Double(_) => ChannelType::Double,
        }
    }

    /// Sample `index` widened to `f64` (flags become 0.0 / 1.0)
    pub fn value_f64(&self, index: usize) -> Option<f64> {
        match self {
            ChannelData::Float(values) => values.get(index).map(|&v| f64::from(v)),
            ChannelData::Bool(values) => values.get(index).map(|&v| if v { 1.0 } else { 0.0 }),
            ChannelData::Count(values) => values.get(index).map(|&v| v as f64),
            ChannelData::Double(values) => values.get(index).copied(),
        }
    }

    /// Native-endian byte image, laid out the way the driver delivers it
    pub fn to_native_bytes(&self) -> Vec<u8> {
        match self {
            ChannelData::Float(values) => values.iter().flat_map(|v| v.to_ne_bytes()).collect(),
            ChannelData::Bool(values) => values.iter().map(|&v| u8::from(v)).collect(),
            ChannelData::Count(values) => values
                .iter()
                .flat_map(|&v| (v as usize).to_ne_bytes())
                .collect(),
            ChannelData::Double(values) => values.iter().flat_map(|v| v.to_ne_bytes()).collect(),
        }
    }
}

/// Batch of newly arrived samples, one equal-length column per stream channel
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    channels: Vec<ChannelData>,
    samples: usize,
}

impl Chunk {
    /// Assemble a chunk; `None` when the columns disagree on length
    pub fn from_channels(channels: Vec<ChannelData>) -> Option<Self> {
        let samples = channels.first().map_or(0, ChannelData::len);
        if channels.iter().any(|channel| channel.len() != samples) {
            return None;
        }
        Some(Self { channels, samples })
    }

    /// Columns already known to hold `samples` values each
    pub(crate) fn from_columns(channels: Vec<ChannelData>, samples: usize) -> Self {
        debug_assert!(channels.iter().all(|channel| channel.len() == samples));
        Self { channels, samples }
    }

    pub fn channels(&self) -> &[ChannelData] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelData> {
        self.channels.get(index)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples in every column
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn into_channels(self) -> Vec<ChannelData> {
        self.channels
    }

    /// Dense `channels x samples` matrix of widened values
    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.channels.len(), self.samples), |(row, col)| {
            self.channels[row].value_f64(col).unwrap_or(0.0)
        })
    }
}
