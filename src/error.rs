// src/error.rs
//! Unified error type for eeg-core
//!
//! Every subsystem owns a narrow error enum. `EegError` wraps them so that
//! application code (and the acquisition controller) can use a single
//! `Result` type and `?` across session, decoding, buffering and
//! configuration calls.

use crate::acquisition::buffer_manager::BufferError;
use crate::acquisition::decoder::DecodeError;
use crate::config::ConfigError;
use crate::hal::simulator::SimulatorError;
use crate::hal::types::NativeError;
use crate::session::SessionError;
use thiserror::Error;

/// Unified error type for the entire crate
#[derive(Debug, Error)]
pub enum EegError {
    /// Synchronous rejection by the native driver
    #[error(transparent)]
    Native(#[from] NativeError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Simulator(#[from] SimulatorError),

    /// An asynchronous request did not complete in time
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("could not connect to {address} after {attempts} attempts")]
    ConnectFailed { address: String, attempts: u32 },

    /// The acquisition has not been set up, or setup failed
    #[error("acquisition is not set up")]
    NotSetUp,
}

impl EegError {
    /// Whether the failure came from the device link going away
    pub fn is_disconnect(&self) -> bool {
        matches!(self, EegError::Session(SessionError::Disconnected))
    }
}

/// Result alias using [`EegError`]
pub type EegResult<T> = Result<T, EegError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn fails_with_session_error() -> EegResult<()> {
        Err(SessionError::Disconnected)?
    }

    #[test]
    fn test_error_conversion() {
        let err: EegError = NativeError::UnsupportedDevice.into();
        assert!(matches!(err, EegError::Native(NativeError::UnsupportedDevice)));

        let err: EegError = BufferError::Empty.into();
        assert!(matches!(err, EegError::Buffer(BufferError::Empty)));
    }

    #[test]
    fn test_question_mark_propagation() {
        let err = fails_with_session_error().unwrap_err();
        assert!(err.is_disconnect());
    }

    #[test]
    fn test_error_display() {
        let err = EegError::ConnectFailed {
            address: "COM4".to_string(),
            attempts: 4,
        };
        assert_eq!(err.to_string(), "could not connect to COM4 after 4 attempts");

        let err = EegError::Timeout { operation: "start_stream" };
        assert_eq!(err.to_string(), "start_stream timed out");

        // transparent variants keep the inner message
        let err: EegError = BufferError::InvalidWidth(0).into();
        assert_eq!(err.to_string(), BufferError::InvalidWidth(0).to_string());
    }
}
