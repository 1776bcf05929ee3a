// src/hal/types.rs
//! Core types shared across the driver boundary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use thiserror::Error;

/// Opaque identifier for one native session, issued by the driver.
///
/// The handle is the registry key and the context value threaded through
/// every streaming and lifecycle callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(NonZeroUsize);

impl Handle {
    /// Wrap a raw driver value; `0` (a null native pointer) is not a handle
    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    /// Raw value as handed to the driver
    pub fn as_raw(self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Context threaded through one-shot operation callbacks.
///
/// Carries the owning session's handle together with the request index
/// issued by that session's pending-operation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpContext {
    pub handle: Handle,
    pub index: usize,
}

/// Immediate status returned by native calls that complete asynchronously
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    ConnectionError,
    UnsupportedDevice,
    Unknown(u8),
}

impl Status {
    /// Map the driver's integer result; anything unrecognised degrades to `Unknown`
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Status::Ok,
            1 => Status::ConnectionError,
            2 => Status::UnsupportedDevice,
            other => Status::Unknown(other),
        }
    }

    /// Integer code as understood by the driver
    pub fn code(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::ConnectionError => 1,
            Status::UnsupportedDevice => 2,
            Status::Unknown(code) => code,
        }
    }

    /// Convert into a result, rejecting every non-OK status
    pub fn into_result(self) -> Result<(), NativeError> {
        match self {
            Status::Ok => Ok(()),
            Status::ConnectionError => Err(NativeError::Connection),
            Status::UnsupportedDevice => Err(NativeError::UnsupportedDevice),
            Status::Unknown(code) => Err(NativeError::Unknown(code)),
        }
    }
}

/// Synchronous rejection reported by the driver at call time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NativeError {
    #[error("connection error")]
    Connection,
    #[error("unsupported device")]
    UnsupportedDevice,
    #[error("unknown error (native code {0:#04x})")]
    Unknown(u8),
}

/// Library or firmware version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self { major, minor, patch }
    }

    /// An installed version satisfies an expected one when the major numbers
    /// agree and the installed minor is not older than the expected minor.
    pub fn is_compatible_with(&self, expected: &Version) -> bool {
        self.major == expected.major && self.minor >= expected.minor
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Device model reported in [`DeviceInfo`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceModel {
    Mini,
    Midi,
    Maxi,
    Emg,
    Halo,
    Unknown,
}

impl DeviceModel {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => DeviceModel::Mini,
            1 => DeviceModel::Midi,
            2 => DeviceModel::Maxi,
            3 => DeviceModel::Emg,
            4 => DeviceModel::Halo,
            _ => DeviceModel::Unknown,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            DeviceModel::Mini => 0,
            DeviceModel::Midi => 1,
            DeviceModel::Maxi => 2,
            DeviceModel::Emg => 3,
            DeviceModel::Halo => 4,
            DeviceModel::Unknown => 0xFF,
        }
    }
}

/// Device information, valid once a connection has succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: DeviceModel,
    pub hardware_version: Version,
    pub firmware_version: Version,
    pub serial_number: u64,
}

/// Capabilities of a device model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceFeatures {
    /// The device can stream gyroscope channels
    pub has_gyro: bool,
    /// Electrodes have separate positive and negative contacts
    pub is_bipolar: bool,
    pub electrode_count: u8,
}

impl DeviceFeatures {
    /// Contact channels reported for each electrode
    pub fn contacts_per_electrode(&self) -> u8 {
        if self.is_bipolar {
            2
        } else {
            1
        }
    }
}

/// Standard battery information pushed by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatteryInfo {
    /// Charge percentage, 0-100
    pub level: u8,
    pub is_charger_connected: bool,
    pub is_charging: bool,
}

/// Extended battery information, requested on demand
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FullBatteryInfo {
    pub is_charging: bool,
    pub is_charger_connected: bool,
    /// Charge percentage, 0-100
    pub level: u8,
    /// Health percentage, 0-100
    pub health: f32,
    /// Volts
    pub voltage: f32,
    /// Amps, negative while discharging
    pub current: f32,
}

/// Amplifier gain for electrode measurement channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GainMode {
    X1,
    X2,
    X4,
    X6,
    X8,
    X12,
    X24,
    Unknown,
}

impl GainMode {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => GainMode::X1,
            1 => GainMode::X2,
            2 => GainMode::X4,
            3 => GainMode::X6,
            4 => GainMode::X8,
            5 => GainMode::X12,
            6 => GainMode::X24,
            _ => GainMode::Unknown,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            GainMode::X1 => 0,
            GainMode::X2 => 1,
            GainMode::X4 => 2,
            GainMode::X6 => 3,
            GainMode::X8 => 4,
            GainMode::X12 => 5,
            GainMode::X24 => 6,
            GainMode::Unknown => 0xFF,
        }
    }

    /// Integer multiplier, e.g. `X12` is 12; `None` for `Unknown`
    pub fn multiplier(self) -> Option<u32> {
        match self {
            GainMode::X1 => Some(1),
            GainMode::X2 => Some(2),
            GainMode::X4 => Some(4),
            GainMode::X6 => Some(6),
            GainMode::X8 => Some(8),
            GainMode::X12 => Some(12),
            GainMode::X24 => Some(24),
            GainMode::Unknown => None,
        }
    }

    /// Inverse of [`GainMode::multiplier`]; unsupported multipliers map to `Unknown`
    pub fn from_multiplier(multiplier: u32) -> Self {
        match multiplier {
            1 => GainMode::X1,
            2 => GainMode::X2,
            4 => GainMode::X4,
            6 => GainMode::X6,
            8 => GainMode::X8,
            12 => GainMode::X12,
            24 => GainMode::X24,
            _ => GainMode::Unknown,
        }
    }
}

impl Default for GainMode {
    fn default() -> Self {
        GainMode::X8
    }
}

/// Impedance measurement excitation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImpedanceMode {
    #[default]
    Off,
    /// 7.8 Hz wave
    Hz7_8,
    /// 31.2 Hz wave
    Hz31_2,
    /// sample rate / 4
    DrDiv4,
}

impl ImpedanceMode {
    pub fn code(self) -> u8 {
        match self {
            ImpedanceMode::Off => 0,
            ImpedanceMode::Hz7_8 => 1,
            ImpedanceMode::Hz31_2 => 2,
            ImpedanceMode::DrDiv4 => 3,
        }
    }
}

/// Which side of an electrode feeds the bias signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Polarity {
    #[default]
    None,
    Positive,
    Negative,
    /// Both sides; the only meaningful choice for unipolar devices
    Both,
}

impl Polarity {
    pub fn code(self) -> u8 {
        match self {
            Polarity::None => 0,
            Polarity::Positive => 1,
            Polarity::Negative => 2,
            Polarity::Both => 3,
        }
    }
}

impl From<bool> for Polarity {
    fn from(enabled: bool) -> Self {
        if enabled {
            Polarity::Both
        } else {
            Polarity::None
        }
    }
}

/// Annotation recorded against the device's sample-number clock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Sample number at which the annotation was recorded
    pub timestamp: u64,
    pub text: String,
}

impl Annotation {
    pub fn new(timestamp: u64, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }
}
