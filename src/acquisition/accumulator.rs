// src/acquisition/accumulator.rs
//! Append-only sample store

use crate::acquisition::buffer_manager::{BufferError, SampleStore};
use ndarray::{s, Array2, ArrayView2};

/// Keeps every ingested block since creation.
///
/// Blocks are stored as they arrive and only concatenated when a snapshot
/// asks for them. Optional leading zero padding sits in front of the first
/// sample and is materialised on demand.
#[derive(Debug, Clone)]
pub struct Accumulator {
    channels: usize,
    padding: usize,
    blocks: Vec<Array2<f64>>,
    ingested: usize,
}

impl Accumulator {
    pub fn new(channels: usize, zeros_at_start: usize) -> Self {
        Self {
            channels,
            padding: zeros_at_start,
            blocks: Vec::new(),
            ingested: 0,
        }
    }

    /// Number of stored blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

impl SampleStore for Accumulator {
    fn channels(&self) -> usize {
        self.channels
    }

    fn retained(&self) -> usize {
        self.padding + self.ingested
    }

    fn origin(&self) -> i64 {
        -(self.padding as i64)
    }

    fn total_ingested(&self) -> u64 {
        self.ingested as u64
    }

    fn ingest(&mut self, block: ArrayView2<'_, f64>) -> Result<(), BufferError> {
        if block.nrows() != self.channels {
            return Err(BufferError::ShapeMismatch {
                expected: self.channels,
                actual: block.nrows(),
            });
        }
        if block.ncols() == 0 {
            return Ok(());
        }
        self.ingested += block.ncols();
        self.blocks.push(block.to_owned());
        Ok(())
    }

    fn tail(&self, len: usize) -> Array2<f64> {
        let len = len.min(self.retained());
        let mut out = Array2::zeros((self.channels, len));
        let mut remaining = len;

        for block in self.blocks.iter().rev() {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(block.ncols());
            out.slice_mut(s![.., remaining - take..remaining])
                .assign(&block.slice(s![.., block.ncols() - take..]));
            remaining -= take;
        }
        // anything left is leading padding and already zero
        out
    }
}
