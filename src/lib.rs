//! EEG-Core: host-side session, decoding and buffering layer for EEG acquisition drivers
//!
//! The vendor driver is a black box that reports results through callbacks.
//! This library turns it into something pleasant to use from Rust:
//!
//! - [`session::Session`] owns one native handle and exposes every
//!   asynchronous driver operation as a [`session::Pending`] result that can
//!   be awaited, waited on, or polled
//! - a process-wide registry routes driver callbacks back to their session
//! - [`acquisition::decode_chunk`] turns raw per-channel byte buffers into
//!   typed [`acquisition::Chunk`]s
//! - [`acquisition::AcquisitionBuffer`] accumulates or rolls samples and
//!   produces snapshots with annotation onsets re-based to the window
//! - [`hal::simulator::SimulatedDriver`] stands in for hardware
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use eeg_core::acquisition::{Acquisition, Window};
//! use eeg_core::config::AcquisitionConfig;
//! use eeg_core::hal::simulator::{SimulatedDriver, SimulatorConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = Arc::new(SimulatedDriver::new(SimulatorConfig::default())?);
//!     let mut acquisition = Acquisition::new(driver, AcquisitionConfig::default())?;
//!
//!     acquisition.setup().await?;
//!     acquisition.start().await?;
//!     acquisition.annotate("eyes closed");
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(2)).await;
//!     let recording = acquisition.snapshot(Window::Seconds(1.0))?;
//!     println!("{} channels x {} samples", recording.channels(), recording.samples());
//!
//!     acquisition.stop().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hal;
pub mod session;
pub mod utils;

// Re-export commonly used types for convenience
pub use acquisition::{AcquisitionBuffer, BufferMode, Chunk, Recording, Window};
pub use error::{EegError, EegResult};
pub use hal::{Driver, Handle};
pub use session::{Pending, Session, SessionError, SessionState};

#[cfg(feature = "desktop")]
pub use acquisition::Acquisition;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    let mut features = vec![
        "Session registry and pending-operation correlation".to_string(),
        "Typed chunk decoding".to_string(),
        "Accumulating and rolling sample buffers".to_string(),
        "Simulated driver".to_string(),
    ];
    if cfg!(feature = "desktop") {
        features.push("Async acquisition controller".to_string());
    }
    if cfg!(feature = "native") {
        features.push("Native core library binding".to_string());
    }

    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Host-side session, decoding and buffering layer for EEG acquisition drivers"
            .to_string(),
        features,
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
