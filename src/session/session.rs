// src/session/session.rs
//! Device session: one native handle and its connection lifecycle

use crate::acquisition::channel_types::ChannelType;
use crate::acquisition::chunk::Chunk;
use crate::acquisition::decoder::DecodeError;
use crate::hal::traits::Driver;
use crate::hal::types::{
    Annotation, BatteryInfo, DeviceFeatures, DeviceInfo, FullBatteryInfo, GainMode, Handle,
    ImpedanceMode, NativeError, OpContext, Polarity, Status,
};
use crate::session::callbacks;
use crate::session::pending::{
    expect_connected, expect_done, expect_full_battery, expect_latency, Completion, Pending,
    PendingOperations,
};
use crate::session::registry::SessionRegistry;
use crate::session::SessionError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Receives every decoded chunk, on the driver's delivery thread
pub type ChunkSink = Box<dyn FnMut(Chunk) + Send>;

/// Receives battery pushes, on the driver's delivery thread
pub type BatterySink = Box<dyn FnMut(BatteryInfo) + Send>;

/// Notified once per connection loss, on the driver's delivery thread
pub type DisconnectSink = Box<dyn FnMut() + Send>;

/// Lifecycle of a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Created,
    Connecting,
    Connected,
    Streaming,
    Disconnected,
    Destroyed,
}

#[derive(Default)]
pub(crate) struct Sinks {
    pub(crate) chunk: Mutex<Option<ChunkSink>>,
    pub(crate) battery: Mutex<Option<BatterySink>>,
    pub(crate) disconnect: Mutex<Option<DisconnectSink>>,
}

/// State reachable from driver callbacks through the registry
pub(crate) struct SessionShared {
    pub(crate) handle: Handle,
    pub(crate) driver: Arc<dyn Driver>,
    pub(crate) state: Mutex<SessionState>,
    pub(crate) pending: PendingOperations,
    pub(crate) sinks: Sinks,
}

impl SessionShared {
    /// Move `from -> to` only if the session is currently in `from`
    pub(crate) fn transition(&self, from: SessionState, to: SessionState) -> bool {
        let mut state = self.state.lock();
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }

    /// Connection loss: the last valid event of a connection
    pub(crate) fn mark_disconnected(&self) -> usize {
        {
            let mut state = self.state.lock();
            if *state != SessionState::Destroyed {
                *state = SessionState::Disconnected;
            }
        }
        self.pending.fail_all(SessionError::Disconnected)
    }
}

/// Owner of one device connection.
///
/// Asynchronous operations return a [`Pending`] result that resolves when
/// the driver reports completion, or with [`SessionError::Disconnected`] if
/// the connection drops first. Requests the driver rejects at call time
/// return the rejection directly and leave nothing pending.
///
/// Dropping the session (or calling [`Session::destroy`]) disconnects,
/// removes it from the registry and releases the native handle.
pub struct Session {
    shared: Arc<SessionShared>,
}

impl Session {
    /// Open a native session on `driver` and register it for callback routing
    pub fn new(driver: Arc<dyn Driver>) -> Result<Self, SessionError> {
        let handle = driver.open_session().ok_or(SessionError::OpenFailed)?;

        let shared = Arc::new(SessionShared {
            handle,
            driver,
            state: Mutex::new(SessionState::Created),
            pending: PendingOperations::new(),
            sinks: Sinks::default(),
        });

        SessionRegistry::global().register(handle, &shared);
        shared
            .driver
            .set_disconnect_callback(handle, Some(callbacks::on_disconnect));

        debug!(%handle, "session opened");
        Ok(Self { shared })
    }

    pub fn handle(&self) -> Handle {
        self.shared.handle
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.lock()
    }

    fn driver(&self) -> &dyn Driver {
        self.shared.driver.as_ref()
    }

    /// Connect to the device at `address`.
    ///
    /// Only one attempt may be outstanding, and only from a session that is
    /// not already connected. Resolves to the driver's verdict, or fails with
    /// [`SessionError::Disconnected`] if a disconnect races it.
    pub fn connect(&self, address: &str) -> Result<Pending<bool>, SessionError> {
        {
            let mut state = self.shared.state.lock();
            match *state {
                SessionState::Created | SessionState::Disconnected => {}
                SessionState::Connecting => return Err(SessionError::ConnectInProgress),
                _ => return Err(SessionError::AlreadyConnected),
            }
            *state = SessionState::Connecting;
        }

        let pending = self.shared.pending.issue(expect_connected);
        let ctx = self.context(&pending);
        info!(handle = %ctx.handle, address, index = ctx.index, "connecting");
        self.driver()
            .connect(ctx.handle, address, callbacks::on_connected, ctx);
        Ok(pending)
    }

    /// Drop the connection. Every pending request fails with `Disconnected`.
    pub fn disconnect(&self) {
        info!(handle = %self.handle(), "disconnecting");
        self.driver().disconnect(self.handle());
        let failed = self.shared.mark_disconnected();
        if failed > 0 {
            debug!(handle = %self.handle(), failed, "pending requests failed on disconnect");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.driver().is_connected(self.handle())
    }

    pub fn is_streaming(&self) -> bool {
        self.driver().is_streaming(self.handle())
    }

    pub fn start_stream(&self) -> Result<Pending<()>, SessionError> {
        self.issue("start_stream", expect_done, |driver, ctx| {
            driver.start_stream(ctx.handle, callbacks::on_stream_started, ctx)
        })
    }

    pub fn stop_stream(&self) -> Result<Pending<()>, SessionError> {
        self.issue("stop_stream", expect_done, |driver, ctx| {
            driver.stop_stream(ctx.handle, callbacks::on_stream_stopped, ctx)
        })
    }

    /// Drive digital output `pin`
    pub fn set_io(&self, pin: u8, state: bool) -> Result<Pending<()>, SessionError> {
        self.issue("set_io", expect_done, |driver, ctx| {
            driver.set_io(ctx.handle, pin, state, callbacks::on_done, ctx)
        })
    }

    /// Measure round-trip latency, in seconds
    pub fn get_latency(&self) -> Result<Pending<f32>, SessionError> {
        self.issue("get_latency", expect_latency, |driver, ctx| {
            driver.get_latency(ctx.handle, callbacks::on_latency, ctx)
        })
    }

    pub fn get_full_battery_info(&self) -> Result<Pending<FullBatteryInfo>, SessionError> {
        self.issue("get_full_battery_info", expect_full_battery, |driver, ctx| {
            driver.get_full_battery_info(ctx.handle, callbacks::on_full_battery, ctx)
        })
    }

    fn issue<T>(
        &self,
        operation: &'static str,
        extract: fn(Completion) -> Option<T>,
        call: impl FnOnce(&dyn Driver, OpContext) -> Status,
    ) -> Result<Pending<T>, SessionError>
    where
        T: Send + 'static,
    {
        let pending = self.shared.pending.issue(extract);
        let ctx = self.context(&pending);
        debug!(handle = %ctx.handle, index = ctx.index, operation, "native call");

        if let Err(err) = call(self.driver(), ctx).into_result() {
            self.shared.pending.withdraw(ctx.index);
            warn!(handle = %ctx.handle, operation, %err, "driver rejected request");
            return Err(err.into());
        }
        Ok(pending)
    }

    fn context<T>(&self, pending: &Pending<T>) -> OpContext {
        OpContext {
            handle: self.handle(),
            index: pending.index(),
        }
    }

    // Stream configuration: takes effect on the next stream start and is
    // reset by the driver when the stream stops.

    pub fn set_channel_enabled(&self, channel: u16, enabled: bool) {
        self.driver()
            .set_channel_enabled(self.handle(), channel, enabled);
    }

    pub fn set_channel_gain(&self, channel: u16, gain: GainMode) {
        self.driver().set_channel_gain(self.handle(), channel, gain);
    }

    pub fn set_channel_bias(&self, channel: u16, polarity: Polarity) {
        self.driver()
            .set_channel_bias(self.handle(), channel, polarity);
    }

    #[deprecated(note = "use `set_channel_bias` with a `Polarity`")]
    pub fn set_channel_bias_enabled(&self, channel: u16, enabled: bool) {
        self.set_channel_bias(channel, Polarity::from(enabled));
    }

    pub fn set_impedance_mode(&self, mode: ImpedanceMode) {
        self.driver().set_impedance_mode(self.handle(), mode);
    }

    pub fn get_battery_info(&self) -> BatteryInfo {
        self.driver().get_battery_info(self.handle())
    }

    pub fn get_device_info(&self) -> DeviceInfo {
        self.driver().get_device_info(self.handle())
    }

    /// Capabilities of the connected device model
    pub fn get_device_features(&self) -> Result<DeviceFeatures, SessionError> {
        let info = self.get_device_info();
        self.driver()
            .get_device_features(&info)
            .ok_or(SessionError::Native(NativeError::UnsupportedDevice))
    }

    /// Column of `channel` inside delivered chunks
    pub fn get_channel_index(&self, channel: u16) -> Result<usize, SessionError> {
        self.driver()
            .get_channel_index(self.handle(), channel)
            .ok_or(SessionError::ChannelNotActive(channel))
    }

    pub fn get_sample_frequency(&self) -> u16 {
        self.driver().get_sample_frequency(self.handle())
    }

    /// Column types of the current stream configuration
    pub fn stream_channel_types(&self) -> Result<Vec<ChannelType>, DecodeError> {
        ChannelType::resolve(&self.driver().get_stream_channel_types(self.handle()))
    }

    /// Install or remove the chunk sink
    pub fn set_chunk_sink(&self, sink: Option<ChunkSink>) {
        let handle = self.handle();
        match sink {
            Some(sink) => {
                *self.shared.sinks.chunk.lock() = Some(sink);
                self.driver()
                    .set_chunk_callback(handle, Some(callbacks::on_chunk));
            }
            None => {
                self.driver().set_chunk_callback(handle, None);
                *self.shared.sinks.chunk.lock() = None;
            }
        }
    }

    pub fn set_battery_sink(&self, sink: Option<BatterySink>) {
        let handle = self.handle();
        match sink {
            Some(sink) => {
                *self.shared.sinks.battery.lock() = Some(sink);
                self.driver()
                    .set_battery_callback(handle, Some(callbacks::on_battery));
            }
            None => {
                self.driver().set_battery_callback(handle, None);
                *self.shared.sinks.battery.lock() = None;
            }
        }
    }

    /// The disconnect notification itself stays registered with the driver
    /// for the lifetime of the session; only the sink is swapped.
    pub fn set_disconnect_sink(&self, sink: Option<DisconnectSink>) {
        *self.shared.sinks.disconnect.lock() = sink;
    }

    /// Record an annotation at the device's current sample number
    pub fn annotate(&self, text: &str) {
        self.driver().annotate(self.handle(), text);
    }

    pub fn get_annotations(&self) -> Vec<Annotation> {
        self.driver().get_annotations(self.handle())
    }

    pub fn clear_annotations(&self) {
        self.driver().clear_annotations(self.handle());
    }

    /// Disconnect, unregister and release the native handle
    pub fn destroy(self) {
        drop(self);
    }

    fn teardown(&mut self) {
        let handle = self.handle();
        // also cancels an attempt that is still connecting
        self.driver().disconnect(handle);

        // the registry entry must be gone before the native handle is released
        SessionRegistry::global().unregister(handle);
        self.driver().set_chunk_callback(handle, None);
        self.driver().set_battery_callback(handle, None);
        self.driver().set_disconnect_callback(handle, None);

        *self.shared.state.lock() = SessionState::Destroyed;
        self.shared.pending.fail_all(SessionError::Disconnected);
        self.driver().close_session(handle);
        debug!(%handle, "session destroyed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("handle", &self.handle())
            .field("state", &self.state())
            .field("pending", &self.shared.pending.len())
            .finish()
    }
}
