// src/config/constants.rs
//! System-wide configuration constants

/// Native core library
pub mod library {
    use crate::hal::types::Version;

    /// Core library version this crate is written against
    pub const EXPECTED_CORE_VERSION: Version = Version::new(2, 0, 0);
}

/// Acquisition defaults
pub mod acquisition {
    /// Gain multiplier applied to electrode channels
    pub const DEFAULT_GAIN_MULTIPLIER: u32 = 8;
    pub const SUPPORTED_GAIN_MULTIPLIERS: [u32; 7] = [1, 2, 4, 6, 8, 12, 24];

    /// Ten seconds at 250 Hz
    pub const DEFAULT_ROLL_WIDTH_SAMPLES: usize = 2500;
    pub const MAX_ROLL_WIDTH_SAMPLES: usize = 10_000_000;
    pub const DEFAULT_ZEROS_AT_START: usize = 0;

    /// Default electrode cap: electrode index and label, 10-20 positions
    pub const DEFAULT_CAP: [(u16, &str); 8] = [
        (0, "F3"),
        (1, "F4"),
        (2, "C3"),
        (3, "C4"),
        (4, "P3"),
        (5, "P4"),
        (6, "O1"),
        (7, "O2"),
    ];
}

/// Connection handling
pub mod connection {
    pub const DEFAULT_ADDRESS: &str = "COM4";
    pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 4;
    pub const MAX_CONNECT_ATTEMPTS: u32 = 20;
    pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;
    pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
    pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5000;
}

/// Simulated driver
pub mod simulation {
    pub const DEFAULT_SAMPLE_FREQUENCY: u16 = 250;
    pub const DEFAULT_ELECTRODE_COUNT: u16 = 8;
    pub const MAX_ELECTRODE_COUNT: u16 = 32;
    pub const DEFAULT_IO_PINS: u8 = 2;
    pub const DEFAULT_CHUNK_SIZE: usize = 25;
    pub const DEFAULT_SERIAL_NUMBER: u64 = 0x5100_0001;
    pub const DEFAULT_SIGNAL_AMPLITUDE_UV: f32 = 20.0;
    pub const DEFAULT_NOISE_LEVEL: f32 = 0.1;
    pub const DEFAULT_LATENCY_SECONDS: f32 = 0.02;

    /// Native status for a stream start or stop in the wrong stream state
    pub const STREAM_STATE_STATUS: u8 = 0xff;

    /// Dominant rhythm of the simulated electrode signal
    pub const ALPHA_HZ: f32 = 10.0;

    /// Offset added to electrode channels while impedance measurement runs
    pub const IMPEDANCE_DRIVE_UV: f32 = 50.0;
}

/// File system paths
pub mod paths {
    pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
    pub const LOCAL_CONFIG_FILE: &str = "eeg.toml";
    pub const CONFIG_EXTENSION: &str = ".toml";
    pub const MAX_CONFIG_FILE_SIZE_BYTES: u64 = 1_048_576;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_defaults_consistent() {
        assert!(acquisition::SUPPORTED_GAIN_MULTIPLIERS
            .contains(&acquisition::DEFAULT_GAIN_MULTIPLIER));
        assert!(acquisition::DEFAULT_ROLL_WIDTH_SAMPLES <= acquisition::MAX_ROLL_WIDTH_SAMPLES);

        let mut electrodes: Vec<u16> = acquisition::DEFAULT_CAP.iter().map(|(e, _)| *e).collect();
        electrodes.dedup();
        assert_eq!(electrodes.len(), acquisition::DEFAULT_CAP.len());
    }

    #[test]
    fn test_connection_defaults() {
        assert!(connection::DEFAULT_CONNECT_ATTEMPTS >= 1);
        assert!(connection::DEFAULT_CONNECT_ATTEMPTS <= connection::MAX_CONNECT_ATTEMPTS);
        assert!(!connection::DEFAULT_ADDRESS.is_empty());
    }

    #[test]
    fn test_simulation_defaults() {
        assert!(simulation::DEFAULT_ELECTRODE_COUNT <= simulation::MAX_ELECTRODE_COUNT);
        assert!(simulation::DEFAULT_SAMPLE_FREQUENCY > 0);
        assert!((0.0..=1.0).contains(&simulation::DEFAULT_NOISE_LEVEL));
    }

    #[test]
    fn test_expected_core_version() {
        assert_eq!(library::EXPECTED_CORE_VERSION.to_string(), "2.0.0");
    }
}
