//! Common utility functions shared by the acquisition modules

pub mod time;

pub use time::{samples_to_seconds, seconds_to_samples};
