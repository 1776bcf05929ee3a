// src/acquisition/buffer_manager.rs
//! Acquisition buffer: concurrent ingest and annotation-aligned snapshots

use crate::acquisition::accumulator::Accumulator;
use crate::acquisition::chunk::Chunk;
use crate::acquisition::ring_buffer::RollingWindow;
use crate::hal::types::Annotation;
use crate::utils::time::{samples_to_seconds, seconds_to_samples};
use ndarray::{Array2, ArrayView2, Axis};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::trace;

/// Buffer error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("block has {actual} channels, buffer holds {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("channel index {index} out of range for {channels} channels")]
    ChannelOutOfRange { index: usize, channels: usize },

    #[error("invalid rolling window width {0}")]
    InvalidWidth(usize),

    #[error("buffer holds no samples")]
    Empty,
}

/// Storage strategy behind an [`AcquisitionBuffer`].
///
/// Sample positions are absolute: sample 0 is the first sample ever
/// ingested, so padding in front of it has negative positions.
pub trait SampleStore: Send + Sync {
    fn channels(&self) -> usize;

    /// Columns currently held, padding included
    fn retained(&self) -> usize;

    /// Absolute position of the oldest retained column
    fn origin(&self) -> i64;

    fn total_ingested(&self) -> u64;

    /// Append a `channels x n` block
    fn ingest(&mut self, block: ArrayView2<'_, f64>) -> Result<(), BufferError>;

    /// The most recent `len` retained columns, oldest first
    fn tail(&self, len: usize) -> Array2<f64>;
}

/// How an [`AcquisitionBuffer`] retains samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferMode {
    /// Keep everything, optionally behind `zeros_at_start` zero columns
    Accumulate { zeros_at_start: usize },
    /// Keep only the most recent `width` samples
    Roll { width: usize },
}

/// Portion of the buffer a snapshot covers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Window {
    All,
    /// The last `floor(seconds * sample_rate)` samples
    Seconds(f64),
    Samples(usize),
}

/// Annotation positioned relative to the first column of a [`Recording`].
///
/// Annotations recorded before the window start get a negative onset.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotAnnotation {
    pub onset_samples: i64,
    pub onset_seconds: f64,
    pub text: String,
}

/// Point-in-time copy of the buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    /// `channels x samples`
    pub data: Array2<f64>,
    pub sample_rate: f64,
    /// Absolute sample position of the first column
    pub first_sample: i64,
    pub annotations: Vec<SnapshotAnnotation>,
}

impl Recording {
    pub fn channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn duration_seconds(&self) -> f64 {
        samples_to_seconds(self.samples() as i64, self.sample_rate)
    }
}

struct State {
    store: Box<dyn SampleStore>,
    annotations: Vec<Annotation>,
}

/// Multi-channel sample buffer shared between one producer (the chunk sink)
/// and any number of snapshot readers.
///
/// Ingest and snapshot take the same reader/writer lock, so a snapshot
/// never observes a partially applied chunk.
pub struct AcquisitionBuffer {
    state: RwLock<State>,
    sample_rate: f64,
    mode: Option<BufferMode>,
}

impl AcquisitionBuffer {
    pub fn new(mode: BufferMode, channels: usize, sample_rate: f64) -> Result<Self, BufferError> {
        let store: Box<dyn SampleStore> = match mode {
            BufferMode::Accumulate { zeros_at_start } => {
                Box::new(Accumulator::new(channels, zeros_at_start))
            }
            BufferMode::Roll { width } => Box::new(RollingWindow::new(channels, width)?),
        };
        let mut buffer = Self::with_store(store, sample_rate);
        buffer.mode = Some(mode);
        Ok(buffer)
    }

    /// Buffer over a caller-provided store
    pub fn with_store(store: Box<dyn SampleStore>, sample_rate: f64) -> Self {
        Self {
            state: RwLock::new(State {
                store,
                annotations: Vec::new(),
            }),
            sample_rate,
            mode: None,
        }
    }

    /// Retention mode; `None` for custom stores
    pub fn mode(&self) -> Option<BufferMode> {
        self.mode
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.state.read().store.channels()
    }

    pub fn total_samples(&self) -> u64 {
        self.state.read().store.total_ingested()
    }

    /// Append a decoded chunk, one row per stream channel
    pub fn ingest(&self, chunk: &Chunk) -> Result<(), BufferError> {
        let block = chunk.to_array();
        self.ingest_array(block.view())
    }

    /// Append a `channels x n` block
    pub fn ingest_array(&self, block: ArrayView2<'_, f64>) -> Result<(), BufferError> {
        let mut state = self.state.write();
        state.store.ingest(block)?;
        trace!(samples = block.ncols(), total = state.store.total_ingested(), "ingested block");
        Ok(())
    }

    pub fn add_annotation(&self, annotation: Annotation) {
        self.state.write().annotations.push(annotation);
    }

    /// Replace every annotation, e.g. with a fresh copy from the device
    pub fn set_annotations(&self, annotations: Vec<Annotation>) {
        self.state.write().annotations = annotations;
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.state.read().annotations.clone()
    }

    /// Copy out `window`, optionally picking and reordering rows by
    /// `channel_order`.
    ///
    /// Annotation onsets are re-based so that 0 is the first column of the
    /// returned data.
    pub fn snapshot(
        &self,
        window: Window,
        channel_order: Option<&[usize]>,
    ) -> Result<Recording, BufferError> {
        let (data, first_sample, annotations) = {
            let state = self.state.read();
            let store = &state.store;

            let retained = store.retained();
            if retained == 0 {
                return Err(BufferError::Empty);
            }
            let len = match window {
                Window::All => retained,
                Window::Seconds(seconds) => seconds_to_samples(seconds, self.sample_rate),
                Window::Samples(samples) => samples,
            }
            .min(retained);

            let first_sample = store.origin() + (retained - len) as i64;
            (store.tail(len), first_sample, state.annotations.clone())
        };

        let data = match channel_order {
            Some(order) => {
                let channels = data.nrows();
                if let Some(&index) = order.iter().find(|&&index| index >= channels) {
                    return Err(BufferError::ChannelOutOfRange { index, channels });
                }
                data.select(Axis(0), order)
            }
            None => data,
        };

        let annotations = annotations
            .into_iter()
            .map(|annotation| {
                let onset_samples = annotation.timestamp as i64 - first_sample;
                SnapshotAnnotation {
                    onset_samples,
                    onset_seconds: samples_to_seconds(onset_samples, self.sample_rate),
                    text: annotation.text,
                }
            })
            .collect();

        Ok(Recording {
            data,
            sample_rate: self.sample_rate,
            first_sample,
            annotations,
        })
    }
}
