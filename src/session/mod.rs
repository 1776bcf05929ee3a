// src/session/mod.rs
//! Device session layer
//!
//! A [`Session`] owns one native handle and turns the driver's
//! callback-driven operations into [`Pending`] results. Driver callbacks are
//! routed back to their session through the process-wide [`SessionRegistry`].

pub mod pending;
pub mod registry;
pub mod session;

mod callbacks;

pub use pending::{Completion, Pending, PendingOperations};
pub use registry::SessionRegistry;
pub use session::{BatterySink, ChunkSink, DisconnectSink, Session, SessionState};

use crate::hal::types::NativeError;
use thiserror::Error;

/// Failures surfaced by session operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The driver rejected the request at call time; no result is pending
    #[error(transparent)]
    Native(#[from] NativeError),

    /// The connection dropped before the request completed
    #[error("device disconnected")]
    Disconnected,

    #[error("channel {0} is not part of the current stream")]
    ChannelNotActive(u16),

    #[error("driver refused to open a session")]
    OpenFailed,

    /// A completion of the wrong kind arrived for the given request index
    #[error("unexpected completion for request {0}")]
    UnexpectedCompletion(usize),

    #[error("a connection attempt is already in progress")]
    ConnectInProgress,

    #[error("session is already connected")]
    AlreadyConnected,
}

impl SessionError {
    /// Whether the driver refused the request outright, as opposed to
    /// accepting it and failing later
    pub fn is_immediate_rejection(&self) -> bool {
        matches!(self, SessionError::Native(_))
    }
}
