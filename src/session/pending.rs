// src/session/pending.rs
//! Pending-operation correlator
//!
//! Turns fire-and-forget native calls into results a caller can wait on.
//! Each request gets an index that travels through the driver as part of the
//! callback context; the completion callback hands the index back and the
//! matching entry is resolved exactly once, either by its completion or by
//! `fail_all` when the connection drops.

use crate::hal::types::FullBatteryInfo;
use crate::session::SessionError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, trace};

/// Payload delivered by a completion callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Completion {
    Connected(bool),
    Done,
    Latency(f32),
    FullBattery(FullBatteryInfo),
}

type Outcome<T> = Result<T, SessionError>;

// A dropped sender means the entry left the table without a completion.
fn closed<T>() -> Outcome<T> {
    Err(SessionError::Disconnected)
}

enum Slot<T> {
    Waiting(oneshot::Receiver<Outcome<T>>),
    Ready(Outcome<T>),
    Taken,
}

impl<T> Slot<T> {
    /// Move a delivered result out of the channel without blocking
    fn settle(&mut self) {
        if let Slot::Waiting(receiver) = self {
            match receiver.try_recv() {
                Ok(outcome) => *self = Slot::Ready(outcome),
                Err(TryRecvError::Closed) => *self = Slot::Ready(closed()),
                Err(TryRecvError::Empty) => {}
            }
        }
    }
}

/// Awaitable result of one asynchronous session operation.
///
/// Resolved exactly once. Offers a blocking [`wait`](Pending::wait), a
/// non-blocking [`try_result`](Pending::try_result) poll, and implements
/// [`Future`] for use from an async runtime.
///
/// The blocking accessors must not be called from inside an async runtime;
/// await the result there instead.
pub struct Pending<T> {
    index: usize,
    slot: Mutex<Slot<T>>,
}

impl<T> Pending<T> {
    /// Request index this result is correlated by
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_ready(&self) -> bool {
        let mut slot = self.slot.lock();
        slot.settle();
        matches!(*slot, Slot::Ready(_))
    }

    /// Block the calling thread until the result arrives
    pub fn wait(self) -> Result<T, SessionError> {
        match self.slot.into_inner() {
            Slot::Waiting(receiver) => receiver.blocking_recv().unwrap_or_else(|_| closed()),
            Slot::Ready(outcome) => outcome,
            Slot::Taken => closed(),
        }
    }
}

impl<T: Clone> Pending<T> {
    /// Non-blocking poll; `None` while the operation is still in flight
    pub fn try_result(&self) -> Option<Result<T, SessionError>> {
        let mut slot = self.slot.lock();
        slot.settle();
        match &*slot {
            Slot::Ready(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// Block for at most `timeout`; `None` if the result did not arrive in time
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, SessionError>> {
        let mut slot = self.slot.lock();
        slot.settle();
        let receiver = match &mut *slot {
            Slot::Ready(outcome) => return Some(outcome.clone()),
            Slot::Taken => return None,
            Slot::Waiting(receiver) => receiver,
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .ok()?;
        let received = runtime.block_on(tokio::time::timeout(timeout, receiver)).ok()?;
        let outcome = received.unwrap_or_else(|_| closed());
        *slot = Slot::Ready(outcome.clone());
        Some(outcome)
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, SessionError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.lock();
        if let Slot::Waiting(receiver) = &mut *slot {
            match Pin::new(receiver).poll(cx) {
                Poll::Ready(received) => {
                    *slot = Slot::Ready(received.unwrap_or_else(|_| closed()));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(outcome) => Poll::Ready(outcome),
            _ => panic!("`Pending` polled after completion"),
        }
    }
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("index", &self.index)
            .field("ready", &self.is_ready())
            .finish()
    }
}

type Resolver = Box<dyn FnOnce(Result<Completion, SessionError>) + Send>;

struct Table {
    next_index: usize,
    entries: HashMap<usize, Resolver>,
}

/// Per-session table of in-flight requests, keyed by request index
pub struct PendingOperations {
    table: Mutex<Table>,
}

impl PendingOperations {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Table whose first issued index is `index`
    pub fn starting_at(index: usize) -> Self {
        Self {
            table: Mutex::new(Table {
                next_index: index,
                entries: HashMap::new(),
            }),
        }
    }

    /// Register a new request.
    ///
    /// `extract` converts the completion payload into the caller's result
    /// type; a payload of the wrong kind resolves the request with
    /// [`SessionError::UnexpectedCompletion`].
    pub fn issue<T>(&self, extract: fn(Completion) -> Option<T>) -> Pending<T>
    where
        T: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();

        let mut table = self.table.lock();
        let mut index = table.next_index;
        while table.entries.contains_key(&index) {
            index = index.wrapping_add(1);
        }
        table.next_index = index.wrapping_add(1);

        let resolver: Resolver = Box::new(move |outcome| {
            let result = outcome.and_then(|completion| {
                extract(completion).ok_or(SessionError::UnexpectedCompletion(index))
            });
            // the caller may have dropped its `Pending`
            let _ = sender.send(result);
        });
        table.entries.insert(index, resolver);
        drop(table);

        debug!(index, "issued pending operation");
        Pending {
            index,
            slot: Mutex::new(Slot::Waiting(receiver)),
        }
    }

    /// Resolve the request at `index`. Unknown indices are ignored.
    pub fn complete(&self, index: usize, completion: Completion) -> bool {
        let resolver = self.table.lock().entries.remove(&index);
        match resolver {
            Some(resolve) => {
                debug!(index, ?completion, "completed pending operation");
                resolve(Ok(completion));
                true
            }
            None => {
                trace!(index, "completion for unknown request ignored");
                false
            }
        }
    }

    /// Drop the request at `index` without resolving it.
    ///
    /// Used when the native call rejected the request synchronously and the
    /// caller receives that rejection instead of a pending result.
    pub fn withdraw(&self, index: usize) -> bool {
        self.table.lock().entries.remove(&index).is_some()
    }

    /// Resolve every in-flight request with `error` and empty the table
    pub fn fail_all(&self, error: SessionError) -> usize {
        let drained: Vec<(usize, Resolver)> = self.table.lock().entries.drain().collect();
        let count = drained.len();
        for (index, resolve) in drained {
            debug!(index, %error, "failing pending operation");
            resolve(Err(error.clone()));
        }
        count
    }

    /// Number of requests still in flight
    pub fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PendingOperations {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn expect_connected(completion: Completion) -> Option<bool> {
    match completion {
        Completion::Connected(success) => Some(success),
        _ => None,
    }
}

pub(crate) fn expect_done(completion: Completion) -> Option<()> {
    match completion {
        Completion::Done => Some(()),
        _ => None,
    }
}

pub(crate) fn expect_latency(completion: Completion) -> Option<f32> {
    match completion {
        Completion::Latency(seconds) => Some(seconds),
        _ => None,
    }
}

pub(crate) fn expect_full_battery(completion: Completion) -> Option<FullBatteryInfo> {
    match completion {
        Completion::FullBattery(info) => Some(info),
        _ => None,
    }
}
