// src/hal/mod.rs
//! Hardware abstraction layer: the driver boundary and its implementations

pub mod channel;
pub mod simulator;
pub mod traits;
pub mod types;

#[cfg(feature = "native")]
pub mod native;


pub use simulator::{SimulatedDriver, SimulatorConfig, SimulatorError};
pub use traits::*;
pub use types::*;
