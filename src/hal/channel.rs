// src/hal/channel.rs
//! Channel id base offsets
//!
//! Channel ids are the numbers passed to the per-channel configuration calls
//! and to `get_channel_index`. Families with several members are addressed by
//! adding the member number to the base, e.g. the accelerometer's z axis is
//! `ACCELEROMETER + 2`.

/// Sample number, counting from 0 at stream start
pub const SAMPLE_NUMBER: u16 = 0;

/// Electrode measurement value (uV)
pub const ELECTRODE_MEASUREMENT: u16 = 1;

/// Positive contact flag of a bipolar electrode
pub const ELECTRODE_CONTACT_P: u16 = 513;

/// Whether the electrode is making contact with the skin
pub const ELECTRODE_CONTACT: u16 = 1025;

/// Negative contact flag of a bipolar electrode
pub const ELECTRODE_CONTACT_N: u16 = 1537;

/// Digital IO pin
pub const DIGITAL_INPUT: u16 = 2049;

pub const GYROSCOPE: u16 = 2497;

pub const ACCELEROMETER: u16 = 2561;

/// Channel id of electrode `n`
pub fn electrode(n: u16) -> u16 {
    ELECTRODE_MEASUREMENT + n
}

/// Channel id of accelerometer axis `axis` (0 = x, 1 = y, 2 = z)
pub fn accelerometer(axis: u16) -> u16 {
    ACCELEROMETER + axis
}
