// src/acquisition/ring_buffer.rs
//! Fixed-width rolling window over the most recent samples

use crate::acquisition::buffer_manager::{BufferError, SampleStore};
use ndarray::{s, Array2, ArrayView2};

/// Multi-channel ring holding exactly `width` columns.
///
/// Starts zero-filled. Each ingest overwrites the oldest columns in place and
/// advances the logical start, so no data is shifted; [`SampleStore::tail`]
/// unrolls the ring oldest first.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    data: Array2<f64>,
    /// Physical column holding the oldest sample
    oldest: usize,
    ingested: u64,
}

impl RollingWindow {
    pub fn new(channels: usize, width: usize) -> Result<Self, BufferError> {
        if width == 0 {
            return Err(BufferError::InvalidWidth(width));
        }
        Ok(Self {
            data: Array2::zeros((channels, width)),
            oldest: 0,
            ingested: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }
}

impl SampleStore for RollingWindow {
    fn channels(&self) -> usize {
        self.data.nrows()
    }

    fn retained(&self) -> usize {
        self.width()
    }

    fn origin(&self) -> i64 {
        self.ingested as i64 - self.width() as i64
    }

    fn total_ingested(&self) -> u64 {
        self.ingested
    }

    fn ingest(&mut self, block: ArrayView2<'_, f64>) -> Result<(), BufferError> {
        if block.nrows() != self.channels() {
            return Err(BufferError::ShapeMismatch {
                expected: self.channels(),
                actual: block.nrows(),
            });
        }

        let width = self.width();
        let n = block.ncols();
        self.ingested += n as u64;

        if n >= width {
            self.data.assign(&block.slice(s![.., n - width..]));
            self.oldest = 0;
            return Ok(());
        }

        let start = self.oldest;
        let first = n.min(width - start);
        self.data
            .slice_mut(s![.., start..start + first])
            .assign(&block.slice(s![.., ..first]));
        self.data
            .slice_mut(s![.., ..n - first])
            .assign(&block.slice(s![.., first..]));
        self.oldest = (start + n) % width;
        Ok(())
    }

    fn tail(&self, len: usize) -> Array2<f64> {
        let width = self.width();
        let len = len.min(width);
        let mut out = Array2::zeros((self.channels(), len));

        let start = (self.oldest + width - len) % width;
        let first = len.min(width - start);
        out.slice_mut(s![.., ..first])
            .assign(&self.data.slice(s![.., start..start + first]));
        out.slice_mut(s![.., first..])
            .assign(&self.data.slice(s![.., ..len - first]));
        out
    }
}
