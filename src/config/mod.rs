// src/config/mod.rs
//! Acquisition configuration
//!
//! Everything here is a convenience layer on top of the session and buffer
//! APIs; the core never reads configuration files on its own.

pub mod constants;
pub mod loader;

pub use loader::{ConfigError, ConfigLoader};

use crate::acquisition::buffer_manager::BufferMode;
use crate::hal::channel;
use crate::hal::simulator::SimulatorConfig;
use crate::hal::types::GainMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Complete acquisition configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    #[serde(default)]
    pub buffer: BufferSettings,

    #[serde(default)]
    pub channels: ChannelSettings,

    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Simulated device, used when no native library is linked
    #[serde(default)]
    pub simulator: Option<SimulatorConfig>,
}

/// Storage strategy of the acquisition buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferModeConfig {
    /// Keep everything since stream start
    #[default]
    Accumulate,
    /// Keep the most recent `roll_width_samples`
    Roll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferSettings {
    #[serde(default)]
    pub mode: BufferModeConfig,

    #[serde(default = "defaults::roll_width_samples")]
    pub roll_width_samples: usize,

    /// Zero columns placed in front of the first sample (accumulate mode)
    #[serde(default = "defaults::zeros_at_start")]
    pub zeros_at_start: usize,
}

/// One electrode of the cap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapElectrode {
    /// Electrode number on the device, counting from 0
    pub electrode: u16,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSettings {
    #[serde(default = "defaults::gain_multiplier")]
    pub gain_multiplier: u32,

    /// Electrodes feeding the bias signal
    #[serde(default)]
    pub bias_electrodes: Vec<u16>,

    #[serde(default = "defaults::cap")]
    pub cap: Vec<CapElectrode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default = "defaults::address")]
    pub address: String,

    #[serde(default = "defaults::attempts")]
    pub attempts: u32,

    #[serde(default = "defaults::connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "defaults::retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Upper bound for stream start/stop and battery queries
    #[serde(default = "defaults::operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

mod defaults {
    use super::CapElectrode;
    use crate::config::constants::{acquisition, connection};

    pub fn roll_width_samples() -> usize { acquisition::DEFAULT_ROLL_WIDTH_SAMPLES }
    pub fn zeros_at_start() -> usize { acquisition::DEFAULT_ZEROS_AT_START }

    pub fn gain_multiplier() -> u32 { acquisition::DEFAULT_GAIN_MULTIPLIER }
    pub fn cap() -> Vec<CapElectrode> {
        acquisition::DEFAULT_CAP
            .iter()
            .map(|&(electrode, label)| CapElectrode { electrode, label: label.to_string() })
            .collect()
    }

    pub fn address() -> String { connection::DEFAULT_ADDRESS.to_string() }
    pub fn attempts() -> u32 { connection::DEFAULT_CONNECT_ATTEMPTS }
    pub fn connect_timeout_ms() -> u64 { connection::DEFAULT_CONNECT_TIMEOUT_MS }
    pub fn retry_delay_ms() -> u64 { connection::DEFAULT_RETRY_DELAY_MS }
    pub fn operation_timeout_ms() -> u64 { connection::DEFAULT_OPERATION_TIMEOUT_MS }
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            mode: BufferModeConfig::default(),
            roll_width_samples: defaults::roll_width_samples(),
            zeros_at_start: defaults::zeros_at_start(),
        }
    }
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            gain_multiplier: defaults::gain_multiplier(),
            bias_electrodes: Vec::new(),
            cap: defaults::cap(),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            address: defaults::address(),
            attempts: defaults::attempts(),
            connect_timeout_ms: defaults::connect_timeout_ms(),
            retry_delay_ms: defaults::retry_delay_ms(),
            operation_timeout_ms: defaults::operation_timeout_ms(),
        }
    }
}

impl BufferSettings {
    pub fn buffer_mode(&self) -> BufferMode {
        match self.mode {
            BufferModeConfig::Accumulate => BufferMode::Accumulate {
                zeros_at_start: self.zeros_at_start,
            },
            BufferModeConfig::Roll => BufferMode::Roll {
                width: self.roll_width_samples,
            },
        }
    }
}

impl ChannelSettings {
    /// Gain mode for the configured multiplier; unsupported values fall back
    /// to the default gain
    pub fn gain_mode(&self) -> GainMode {
        match GainMode::from_multiplier(self.gain_multiplier) {
            GainMode::Unknown => GainMode::default(),
            gain => gain,
        }
    }

    /// Channel ids and labels of the recorded channels, in recording order:
    /// cap electrodes, accelerometer axes, digital input, sample number
    pub fn recorded_channels(&self) -> Vec<(u16, String)> {
        let mut channels: Vec<(u16, String)> = self
            .cap
            .iter()
            .map(|e| (channel::electrode(e.electrode), e.label.clone()))
            .collect();
        for (axis, label) in ["Accel_x", "Accel_y", "Accel_z"].into_iter().enumerate() {
            channels.push((channel::accelerometer(axis as u16), label.to_string()));
        }
        channels.push((channel::DIGITAL_INPUT, "Digital".to_string()));
        channels.push((channel::SAMPLE_NUMBER, "Sample".to_string()));
        channels
    }
}

impl ConnectionSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl AcquisitionConfig {
    /// Check the configuration for internal consistency.
    ///
    /// Returns every problem found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        use constants::{acquisition, connection};

        let mut errors = Vec::new();

        if self.buffer.mode == BufferModeConfig::Roll
            && (self.buffer.roll_width_samples == 0
                || self.buffer.roll_width_samples > acquisition::MAX_ROLL_WIDTH_SAMPLES)
        {
            errors.push(format!(
                "roll_width_samples must be within 1..={}, got {}",
                acquisition::MAX_ROLL_WIDTH_SAMPLES,
                self.buffer.roll_width_samples
            ));
        }

        if !acquisition::SUPPORTED_GAIN_MULTIPLIERS.contains(&self.channels.gain_multiplier) {
            errors.push(format!(
                "gain_multiplier {} not in {:?}",
                self.channels.gain_multiplier,
                acquisition::SUPPORTED_GAIN_MULTIPLIERS
            ));
        }

        if self.channels.cap.is_empty() {
            errors.push("cap must list at least one electrode".to_string());
        }
        let mut seen = BTreeSet::new();
        for electrode in &self.channels.cap {
            if !seen.insert(electrode.electrode) {
                errors.push(format!("electrode {} listed twice in cap", electrode.electrode));
            }
        }
        for bias in &self.channels.bias_electrodes {
            if !seen.contains(bias) {
                errors.push(format!("bias electrode {} is not part of the cap", bias));
            }
        }

        if self.connection.address.is_empty() {
            errors.push("connection address is empty".to_string());
        }
        if self.connection.attempts == 0 || self.connection.attempts > connection::MAX_CONNECT_ATTEMPTS
        {
            errors.push(format!(
                "connection attempts must be within 1..={}, got {}",
                connection::MAX_CONNECT_ATTEMPTS,
                self.connection.attempts
            ));
        }

        if let Some(simulator) = &self.simulator {
            if let Err(err) = simulator.validate() {
                errors.push(format!("simulator: {}", err));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
