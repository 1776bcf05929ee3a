// src/session/registry.rs
//! Process-wide session registry
//!
//! Driver callbacks only carry the native handle. The registry maps that
//! handle back to the session that owns it. A missing entry means the session
//! was already torn down and the callback is dropped.

use crate::hal::types::Handle;
use crate::session::session::SessionShared;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};
use tracing::trace;

/// Handle to owner map guarded by one exclusive lock
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Handle, Weak<SessionShared>>>,
}

static REGISTRY: OnceLock<SessionRegistry> = OnceLock::new();

impl SessionRegistry {
    fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The single access point used by sessions and callback trampolines
    pub fn global() -> &'static SessionRegistry {
        REGISTRY.get_or_init(SessionRegistry::new)
    }

    pub(crate) fn register(&self, handle: Handle, session: &Arc<SessionShared>) {
        trace!(%handle, "registering session");
        self.sessions.lock().insert(handle, Arc::downgrade(session));
    }

    pub(crate) fn unregister(&self, handle: Handle) {
        trace!(%handle, "unregistering session");
        self.sessions.lock().remove(&handle);
    }

    /// Resolve `handle` to a strong reference.
    ///
    /// The reference is taken while the lock is held, so the session stays
    /// alive for as long as the caller keeps it even if it is unregistered
    /// concurrently.
    pub(crate) fn lookup(&self, handle: Handle) -> Option<Arc<SessionShared>> {
        self.sessions.lock().get(&handle).and_then(Weak::upgrade)
    }

    /// Whether a live session currently owns `handle`
    pub fn contains(&self, handle: Handle) -> bool {
        self.lookup(handle).is_some()
    }

    /// Number of registered handles
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
