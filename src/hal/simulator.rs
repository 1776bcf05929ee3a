// src/hal/simulator.rs
//! In-process simulated acquisition driver
//!
//! Behaves like the native library from the session's point of view: every
//! completion and streaming callback is delivered from a dedicated driver
//! thread, never from the calling thread. Test hooks allow holding
//! completions back, injecting connection loss and emitting chunks on demand.

use crate::acquisition::channel_types::ChannelType;
use crate::config::constants::simulation;
use crate::hal::channel;
use crate::hal::traits::{
    BatteryCallback, ChunkCallback, ConnectCallback, DisconnectCallback, DoneCallback, Driver,
    FullBatteryCallback, LatencyCallback,
};
use crate::hal::types::{
    Annotation, BatteryInfo, DeviceFeatures, DeviceInfo, DeviceModel, FullBatteryInfo, GainMode,
    Handle, ImpedanceMode, OpContext, Polarity, Status, Version,
};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Handles are unique across every simulator in the process, the same way
/// native handles are unique pointers.
static NEXT_HANDLE: AtomicUsize = AtomicUsize::new(1);

/// Simulated device description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub model: DeviceModel,
    pub serial_number: u64,
    pub sample_frequency: u16,
    pub electrode_count: u16,
    /// Digital IO pins available to `set_io` and as digital input channels
    pub io_pins: u8,
    /// Outcome reported for every connection attempt
    pub connect_succeeds: bool,
    /// Amplitude of the simulated electrode signal, in uV
    pub signal_amplitude: f32,
    pub noise_level: f32,
    pub latency_seconds: f32,
    /// When set, streaming handles receive a chunk this often without
    /// calling [`SimulatedDriver::emit_chunk`]
    pub auto_stream_interval_ms: Option<u64>,
    /// Samples per automatically emitted chunk
    pub chunk_size: usize,
    pub seed: u64,
    pub battery: BatteryInfo,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            model: DeviceModel::Midi,
            serial_number: simulation::DEFAULT_SERIAL_NUMBER,
            sample_frequency: simulation::DEFAULT_SAMPLE_FREQUENCY,
            electrode_count: simulation::DEFAULT_ELECTRODE_COUNT,
            io_pins: simulation::DEFAULT_IO_PINS,
            connect_succeeds: true,
            signal_amplitude: simulation::DEFAULT_SIGNAL_AMPLITUDE_UV,
            noise_level: simulation::DEFAULT_NOISE_LEVEL,
            latency_seconds: simulation::DEFAULT_LATENCY_SECONDS,
            auto_stream_interval_ms: None,
            chunk_size: simulation::DEFAULT_CHUNK_SIZE,
            seed: 0x5EED,
            battery: BatteryInfo {
                level: 87,
                is_charger_connected: false,
                is_charging: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulatorError {
    #[error("sample frequency must be positive")]
    InvalidSampleFrequency,
    #[error("electrode count {0} is out of range")]
    InvalidElectrodeCount(u16),
    #[error("noise level {0} outside 0.0..=1.0")]
    InvalidNoiseLevel(f32),
    #[error("chunk size must be positive")]
    InvalidChunkSize,
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), SimulatorError> {
        if self.sample_frequency == 0 {
            return Err(SimulatorError::InvalidSampleFrequency);
        }
        if self.electrode_count == 0 || self.electrode_count > simulation::MAX_ELECTRODE_COUNT {
            return Err(SimulatorError::InvalidElectrodeCount(self.electrode_count));
        }
        if !(0.0..=1.0).contains(&self.noise_level) {
            return Err(SimulatorError::InvalidNoiseLevel(self.noise_level));
        }
        if self.chunk_size == 0 {
            return Err(SimulatorError::InvalidChunkSize);
        }
        Ok(())
    }
}

/// Work item for the driver thread
enum Event {
    Connected(ConnectCallback, bool, OpContext),
    Done(DoneCallback, OpContext),
    Latency(LatencyCallback, f32, OpContext),
    FullBattery(FullBatteryCallback, FullBatteryInfo, OpContext),
    Chunk(Handle, usize),
    Battery(Handle),
    Disconnect(Handle),
    Barrier(Sender<()>),
    Shutdown,
}

impl Event {
    fn is_completion(&self) -> bool {
        matches!(
            self,
            Event::Connected(..) | Event::Done(..) | Event::Latency(..) | Event::FullBattery(..)
        )
    }
}

#[derive(Default)]
struct DeviceState {
    connected: bool,
    streaming: bool,
    enabled: BTreeSet<u16>,
    gains: BTreeMap<u16, GainMode>,
    bias: BTreeMap<u16, Polarity>,
    impedance: ImpedanceMode,
    /// Channel layout frozen at stream start
    layout: Vec<u16>,
    sample_number: u64,
    annotations: Vec<Annotation>,
    chunk_cb: Option<ChunkCallback>,
    battery_cb: Option<BatteryCallback>,
    disconnect_cb: Option<DisconnectCallback>,
}

impl DeviceState {
    fn reset_stream_config(&mut self) {
        self.enabled.clear();
        self.gains.clear();
        self.bias.clear();
        self.impedance = ImpedanceMode::Off;
    }
}

struct Inner {
    config: SimulatorConfig,
    devices: Mutex<HashMap<Handle, DeviceState>>,
    events: Sender<Event>,
    hold: Mutex<Option<Vec<Event>>>,
    rejections: Mutex<VecDeque<Status>>,
    rng: Mutex<StdRng>,
    disconnect_requests: AtomicUsize,
}

impl Inner {
    fn send(&self, event: Event) {
        if event.is_completion() {
            if let Some(held) = self.hold.lock().as_mut() {
                held.push(event);
                return;
            }
        }
        if self.events.send(event).is_err() {
            warn!("simulated driver thread is gone, event dropped");
        }
    }

    fn take_rejection(&self) -> Option<Status> {
        self.rejections.lock().pop_front()
    }

    fn with_device<R>(&self, handle: Handle, f: impl FnOnce(&mut DeviceState) -> R) -> Option<R> {
        self.devices.lock().get_mut(&handle).map(f)
    }

    fn lose_connection(&self, handle: Handle) {
        let dropped = self
            .with_device(handle, |device| {
                let was_connected = device.connected;
                device.connected = false;
                device.streaming = false;
                device.layout.clear();
                device.annotations.clear();
                device.reset_stream_config();
                was_connected
            })
            .unwrap_or(false);
        if dropped {
            debug!(%handle, "simulated connection lost");
            self.send(Event::Disconnect(handle));
        }
    }

    fn channel_supported(&self, id: u16) -> bool {
        let electrodes = self.config.electrode_count;
        let in_family = |base: u16, count: u16| id >= base && id < base + count;
        id == channel::SAMPLE_NUMBER
            || in_family(channel::ELECTRODE_MEASUREMENT, electrodes)
            || in_family(channel::ELECTRODE_CONTACT, electrodes)
            || in_family(channel::DIGITAL_INPUT, u16::from(self.config.io_pins))
            || in_family(channel::ACCELEROMETER, 3)
    }

    fn channel_type(id: u16) -> ChannelType {
        match id {
            channel::SAMPLE_NUMBER => ChannelType::Count,
            id if (channel::ELECTRODE_CONTACT_P..channel::GYROSCOPE).contains(&id) => {
                ChannelType::Bool
            }
            _ => ChannelType::Float,
        }
    }

    /// Build one delivery for `handle`; the device lock is released before return
    fn render_chunk(&self, handle: Handle, count: usize) -> Option<(ChunkCallback, Vec<Vec<u8>>)> {
        let mut devices = self.devices.lock();
        let device = devices.get_mut(&handle)?;
        if !device.streaming {
            return None;
        }
        let callback = device.chunk_cb?;

        let first = device.sample_number;
        device.sample_number += count as u64;
        let layout = device.layout.clone();
        let impedance = device.impedance;
        drop(devices);

        let rate = f32::from(self.config.sample_frequency);
        let mut rng = self.rng.lock();
        let buffers = layout
            .iter()
            .map(|&id| -> Vec<u8> {
                let n = first..first + count as u64;
                match Self::channel_type(id) {
                    ChannelType::Count => n.flat_map(|s| (s as usize).to_ne_bytes()).collect(),
                    ChannelType::Bool => n.map(|_| u8::from(id < channel::DIGITAL_INPUT)).collect(),
                    _ if id >= channel::ACCELEROMETER => n
                        .flat_map(|_| (rng.gen_range(-0.05f32..0.05)).to_ne_bytes())
                        .collect(),
                    _ => n
                        .flat_map(|s| {
                            let phase = std::f32::consts::TAU * simulation::ALPHA_HZ * s as f32 / rate;
                            let drive = match impedance {
                                ImpedanceMode::Off => 0.0,
                                _ => simulation::IMPEDANCE_DRIVE_UV,
                            };
                            let noise = rng.gen_range(-1.0f32..1.0) * self.config.noise_level;
                            let value = self.config.signal_amplitude * (phase.sin() + noise) + drive;
                            value.to_ne_bytes()
                        })
                        .collect(),
                }
            })
            .collect();
        Some((callback, buffers))
    }

    fn dispatch(&self, event: Event) {
        match event {
            Event::Connected(callback, success, ctx) => callback(success, ctx),
            Event::Done(callback, ctx) => callback(ctx),
            Event::Latency(callback, seconds, ctx) => callback(seconds, ctx),
            Event::FullBattery(callback, info, ctx) => callback(info, ctx),
            Event::Chunk(handle, count) => {
                if let Some((callback, buffers)) = self.render_chunk(handle, count) {
                    let views: Vec<&[u8]> = buffers.iter().map(Vec::as_slice).collect();
                    trace!(%handle, count, "delivering simulated chunk");
                    callback(&views, count, handle);
                }
            }
            Event::Battery(handle) => {
                let callback = self.with_device(handle, |device| device.battery_cb).flatten();
                if let Some(callback) = callback {
                    callback(self.config.battery, handle);
                }
            }
            Event::Disconnect(handle) => {
                let callback = self.with_device(handle, |device| device.disconnect_cb).flatten();
                if let Some(callback) = callback {
                    callback(handle);
                }
            }
            Event::Barrier(done) => {
                let _ = done.send(());
            }
            Event::Shutdown => {}
        }
    }

    fn streaming_handles(&self) -> Vec<Handle> {
        self.devices
            .lock()
            .iter()
            .filter(|(_, device)| device.streaming)
            .map(|(&handle, _)| handle)
            .collect()
    }
}

fn run(inner: Arc<Inner>, events: Receiver<Event>) {
    let interval = inner.config.auto_stream_interval_ms.map(Duration::from_millis);
    loop {
        let event = match interval {
            Some(interval) => match events.recv_timeout(interval) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    for handle in inner.streaming_handles() {
                        inner.dispatch(Event::Chunk(handle, inner.config.chunk_size));
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match events.recv() {
                Ok(event) => event,
                Err(_) => break,
            },
        };
        if matches!(event, Event::Shutdown) {
            break;
        }
        inner.dispatch(event);
    }
    debug!("simulated driver thread stopped");
}

/// Simulated driver with its own delivery thread.
///
/// Typical test usage:
///
/// ```rust,no_run
/// use eeg_core::hal::simulator::SimulatedDriver;
/// use eeg_core::session::Session;
/// use std::sync::Arc;
///
/// let driver = Arc::new(SimulatedDriver::new(Default::default()).unwrap());
/// let session = Session::new(driver.clone()).unwrap();
/// assert_eq!(session.connect("sim").unwrap().wait(), Ok(true));
/// ```
pub struct SimulatedDriver {
    inner: Arc<Inner>,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedDriver {
    pub fn new(config: SimulatorConfig) -> Result<Self, SimulatorError> {
        config.validate()?;

        let (tx, rx) = unbounded();
        let inner = Arc::new(Inner {
            rng: Mutex::new(StdRng::seed_from_u64(config.seed)),
            config,
            devices: Mutex::new(HashMap::new()),
            events: tx,
            hold: Mutex::new(None),
            rejections: Mutex::new(VecDeque::new()),
            disconnect_requests: AtomicUsize::new(0),
        });

        let worker = {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name("eeg-sim-driver".into())
                .spawn(move || run(inner, rx))
                .ok()
        };
        if worker.is_none() {
            warn!("could not spawn simulated driver thread");
        }

        Ok(Self { inner, worker })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.inner.config
    }

    /// Queue completions instead of delivering them
    pub fn hold_completions(&self, hold: bool) {
        if hold {
            self.inner.hold.lock().get_or_insert_with(Vec::new);
        } else {
            let held = self.inner.hold.lock().take().unwrap_or_default();
            for event in held {
                self.inner.send(event);
            }
        }
    }

    /// Deliver every held completion, in issue order, and keep holding new ones
    pub fn release_completions(&self) {
        let held = self
            .inner
            .hold
            .lock()
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default();
        for event in held {
            if self.inner.events.send(event).is_err() {
                warn!("simulated driver thread is gone, event dropped");
            }
        }
    }

    /// Reject the next asynchronous request with `status`
    pub fn reject_next(&self, status: Status) {
        self.inner.rejections.lock().push_back(status);
    }

    /// Deliver one chunk of `count` samples if `handle` is streaming
    pub fn emit_chunk(&self, handle: Handle, count: usize) {
        self.inner.send(Event::Chunk(handle, count));
    }

    /// Push the configured battery status to the battery callback
    pub fn emit_battery(&self, handle: Handle) {
        self.inner.send(Event::Battery(handle));
    }

    /// Simulate the device going away
    pub fn drop_connection(&self, handle: Handle) {
        self.inner.lose_connection(handle);
    }

    /// Block until every event queued so far has been delivered
    pub fn sync(&self) {
        let (tx, rx) = crossbeam::channel::bounded(1);
        if self.inner.events.send(Event::Barrier(tx)).is_ok() {
            let _ = rx.recv();
        }
    }

    /// Number of sessions currently open
    pub fn open_sessions(&self) -> usize {
        self.inner.devices.lock().len()
    }

    /// Number of disconnect requests received, connected or not
    pub fn disconnect_requests(&self) -> usize {
        self.inner.disconnect_requests.load(Ordering::SeqCst)
    }

    fn accept(&self, handle: Handle, operation: &'static str) -> Status {
        if let Some(status) = self.inner.take_rejection() {
            debug!(%handle, operation, ?status, "injected rejection");
            return status;
        }
        let connected = self
            .inner
            .with_device(handle, |device| device.connected)
            .unwrap_or(false);
        if connected {
            Status::Ok
        } else {
            Status::ConnectionError
        }
    }
}

impl Drop for SimulatedDriver {
    fn drop(&mut self) {
        let _ = self.inner.events.send(Event::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

impl Driver for SimulatedDriver {
    fn open_session(&self) -> Option<Handle> {
        let handle = Handle::from_raw(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))?;
        self.inner.devices.lock().insert(handle, DeviceState::default());
        Some(handle)
    }

    fn close_session(&self, handle: Handle) {
        self.inner.devices.lock().remove(&handle);
    }

    fn connect(&self, handle: Handle, address: &str, on_done: ConnectCallback, ctx: OpContext) {
        let success = self.inner.config.connect_succeeds && !address.is_empty();
        debug!(%handle, address, success, "simulated connect");

        // the link is up as soon as the attempt succeeds; only the completion
        // is deferred to the driver thread
        if success {
            self.inner.with_device(handle, |device| device.connected = true);
        }
        self.inner.send(Event::Connected(on_done, success, ctx));
    }

    fn disconnect(&self, handle: Handle) {
        self.inner.disconnect_requests.fetch_add(1, Ordering::SeqCst);
        self.inner.lose_connection(handle);
    }

    fn is_connected(&self, handle: Handle) -> bool {
        self.inner
            .with_device(handle, |device| device.connected)
            .unwrap_or(false)
    }

    fn start_stream(&self, handle: Handle, on_done: DoneCallback, ctx: OpContext) -> Status {
        let status = self.accept(handle, "start_stream");
        if status != Status::Ok {
            return status;
        }
        if self.is_streaming(handle) {
            debug!(%handle, "stream already running");
            return Status::Unknown(simulation::STREAM_STATE_STATUS);
        }
        let inner = &self.inner;
        inner.with_device(handle, |device| {
            device.layout = device
                .enabled
                .iter()
                .copied()
                .filter(|&id| inner.channel_supported(id))
                .collect();
            device.sample_number = 0;
            device.streaming = true;
        });
        inner.send(Event::Done(on_done, ctx));
        Status::Ok
    }

    fn stop_stream(&self, handle: Handle, on_done: DoneCallback, ctx: OpContext) -> Status {
        let status = self.accept(handle, "stop_stream");
        if status != Status::Ok {
            return status;
        }
        if !self.is_streaming(handle) {
            debug!(%handle, "no stream to stop");
            return Status::Unknown(simulation::STREAM_STATE_STATUS);
        }
        self.inner.with_device(handle, |device| {
            device.streaming = false;
            device.layout.clear();
            device.reset_stream_config();
        });
        self.inner.send(Event::Done(on_done, ctx));
        Status::Ok
    }

    fn is_streaming(&self, handle: Handle) -> bool {
        self.inner
            .with_device(handle, |device| device.streaming)
            .unwrap_or(false)
    }

    fn set_io(
        &self,
        handle: Handle,
        pin: u8,
        state: bool,
        on_done: DoneCallback,
        ctx: OpContext,
    ) -> Status {
        if pin >= self.inner.config.io_pins {
            return Status::UnsupportedDevice;
        }
        let status = self.accept(handle, "set_io");
        if status == Status::Ok {
            trace!(%handle, pin, state, "simulated set_io");
            self.inner.send(Event::Done(on_done, ctx));
        }
        status
    }

    fn get_battery_info(&self, _handle: Handle) -> BatteryInfo {
        self.inner.config.battery
    }

    fn get_full_battery_info(
        &self,
        handle: Handle,
        on_done: FullBatteryCallback,
        ctx: OpContext,
    ) -> Status {
        let status = self.accept(handle, "get_full_battery_info");
        if status == Status::Ok {
            let battery = self.inner.config.battery;
            let info = FullBatteryInfo {
                is_charging: battery.is_charging,
                is_charger_connected: battery.is_charger_connected,
                level: battery.level,
                health: 100.0,
                voltage: 3.7,
                current: -0.05,
            };
            self.inner.send(Event::FullBattery(on_done, info, ctx));
        }
        status
    }

    fn get_latency(&self, handle: Handle, on_done: LatencyCallback, ctx: OpContext) -> Status {
        let status = self.accept(handle, "get_latency");
        if status == Status::Ok {
            let seconds = self.inner.config.latency_seconds;
            self.inner.send(Event::Latency(on_done, seconds, ctx));
        }
        status
    }

    fn set_channel_enabled(&self, handle: Handle, channel: u16, enabled: bool) {
        self.inner.with_device(handle, |device| {
            if enabled {
                device.enabled.insert(channel);
            } else {
                device.enabled.remove(&channel);
            }
        });
    }

    fn set_channel_gain(&self, handle: Handle, channel: u16, gain: GainMode) {
        self.inner.with_device(handle, |device| {
            device.gains.insert(channel, gain);
        });
    }

    fn set_channel_bias(&self, handle: Handle, channel: u16, polarity: Polarity) {
        self.inner.with_device(handle, |device| {
            device.bias.insert(channel, polarity);
        });
    }

    fn set_impedance_mode(&self, handle: Handle, mode: ImpedanceMode) {
        self.inner.with_device(handle, |device| device.impedance = mode);
    }

    fn get_device_info(&self, _handle: Handle) -> DeviceInfo {
        DeviceInfo {
            model: self.inner.config.model,
            hardware_version: Version::new(1, 0, 0),
            firmware_version: Version::new(1, 2, 0),
            serial_number: self.inner.config.serial_number,
        }
    }

    fn get_device_features(&self, info: &DeviceInfo) -> Option<DeviceFeatures> {
        // only the simulated model is known
        (info.model == self.inner.config.model).then(|| DeviceFeatures {
            has_gyro: false,
            is_bipolar: false,
            electrode_count: u8::try_from(self.inner.config.electrode_count).unwrap_or(u8::MAX),
        })
    }

    fn get_channel_index(&self, handle: Handle, channel: u16) -> Option<usize> {
        self.inner
            .with_device(handle, |device| {
                device.layout.iter().position(|&id| id == channel)
            })
            .flatten()
    }

    fn get_sample_frequency(&self, _handle: Handle) -> u16 {
        self.inner.config.sample_frequency
    }

    fn get_stream_channel_types(&self, handle: Handle) -> Vec<u8> {
        self.inner
            .with_device(handle, |device| {
                device
                    .layout
                    .iter()
                    .map(|&id| Inner::channel_type(id).tag())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn set_chunk_callback(&self, handle: Handle, callback: Option<ChunkCallback>) {
        self.inner.with_device(handle, |device| device.chunk_cb = callback);
    }

    fn set_battery_callback(&self, handle: Handle, callback: Option<BatteryCallback>) {
        self.inner.with_device(handle, |device| device.battery_cb = callback);
    }

    fn set_disconnect_callback(&self, handle: Handle, callback: Option<DisconnectCallback>) {
        self.inner
            .with_device(handle, |device| device.disconnect_cb = callback);
    }

    fn annotate(&self, handle: Handle, text: &str) {
        self.inner.with_device(handle, |device| {
            let annotation = Annotation::new(device.sample_number, text);
            device.annotations.push(annotation);
        });
    }

    fn get_annotations(&self, handle: Handle) -> Vec<Annotation> {
        self.inner
            .with_device(handle, |device| device.annotations.clone())
            .unwrap_or_default()
    }

    fn clear_annotations(&self, handle: Handle) {
        self.inner
            .with_device(handle, |device| device.annotations.clear());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_configuration_validation() {
        let mut config = SimulatorConfig::default();
        assert!(config.validate().is_ok());

        config.sample_frequency = 0;
        assert_eq!(config.validate(), Err(SimulatorError::InvalidSampleFrequency));

        config.sample_frequency = 250;
        config.noise_level = 1.5;
        assert_eq!(config.validate(), Err(SimulatorError::InvalidNoiseLevel(1.5)));

        config.noise_level = 0.1;
        config.electrode_count = 0;
        assert!(SimulatedDriver::new(config).is_err());
    }

    #[test]
    fn test_handles_are_unique() {
        let a = SimulatedDriver::new(SimulatorConfig::default()).unwrap();
        let b = SimulatedDriver::new(SimulatorConfig::default()).unwrap();
        let h1 = a.open_session().unwrap();
        let h2 = b.open_session().unwrap();
        let h3 = a.open_session().unwrap();
        assert_ne!(h1, h2);
        assert_ne!(h1, h3);
        assert_eq!(a.open_sessions(), 2);
        a.close_session(h1);
        assert_eq!(a.open_sessions(), 1);
    }

    #[test]
    fn test_stream_requires_connection() {
        fn ignore(_: OpContext) {}
        let driver = SimulatedDriver::new(SimulatorConfig::default()).unwrap();
        let handle = driver.open_session().unwrap();
        let ctx = OpContext { handle, index: 0 };
        assert_eq!(driver.start_stream(handle, ignore, ctx), Status::ConnectionError);
    }

    #[test]
    fn test_layout_follows_enabled_channels() {
        fn ignore_connect(_: bool, _: OpContext) {}
        fn ignore(_: OpContext) {}

        let driver = SimulatedDriver::new(SimulatorConfig::default()).unwrap();
        let handle = driver.open_session().unwrap();
        let ctx = OpContext { handle, index: 0 };
        driver.connect(handle, "sim", ignore_connect, ctx);

        driver.set_channel_enabled(handle, channel::electrode(1), true);
        driver.set_channel_enabled(handle, channel::SAMPLE_NUMBER, true);
        driver.set_channel_enabled(handle, channel::ELECTRODE_CONTACT, true);
        driver.set_channel_enabled(handle, 9999, true);
        assert_eq!(driver.start_stream(handle, ignore, ctx), Status::Ok);

        assert_eq!(driver.get_channel_index(handle, channel::SAMPLE_NUMBER), Some(0));
        assert_eq!(driver.get_channel_index(handle, channel::electrode(1)), Some(1));
        assert_eq!(driver.get_channel_index(handle, channel::ELECTRODE_CONTACT), Some(2));
        assert_eq!(driver.get_channel_index(handle, 9999), None);
        assert_eq!(driver.get_stream_channel_types(handle), vec![2, 0, 1]);

        // a running stream cannot be started again
        assert_eq!(
            driver.start_stream(handle, ignore, ctx),
            Status::Unknown(simulation::STREAM_STATE_STATUS)
        );

        // configuration is scoped to one stream
        assert_eq!(driver.stop_stream(handle, ignore, ctx), Status::Ok);
        assert!(driver.get_stream_channel_types(handle).is_empty());
        assert_eq!(
            driver.stop_stream(handle, ignore, ctx),
            Status::Unknown(simulation::STREAM_STATE_STATUS)
        );
    }

    static DISCONNECTED: AtomicBool = AtomicBool::new(false);

    #[test]
    fn test_drop_connection_notifies_and_clears_annotations() {
        fn ignore_connect(_: bool, _: OpContext) {}
        fn on_disconnect(_: Handle) {
            DISCONNECTED.store(true, Ordering::SeqCst);
        }

        let driver = SimulatedDriver::new(SimulatorConfig::default()).unwrap();
        let handle = driver.open_session().unwrap();
        driver.set_disconnect_callback(handle, Some(on_disconnect));
        driver.connect(handle, "sim", ignore_connect, OpContext { handle, index: 0 });
        driver.annotate(handle, "blink");
        assert_eq!(driver.get_annotations(handle).len(), 1);

        driver.drop_connection(handle);
        driver.sync();
        assert!(DISCONNECTED.load(Ordering::SeqCst));
        assert!(!driver.is_connected(handle));
        assert!(driver.get_annotations(handle).is_empty());
    }

    #[test]
    fn test_features_of_simulated_model() {
        let driver = SimulatedDriver::new(SimulatorConfig {
            electrode_count: 16,
            ..Default::default()
        })
        .unwrap();
        let handle = driver.open_session().unwrap();
        let mut info = driver.get_device_info(handle);

        let features = driver.get_device_features(&info).unwrap();
        assert_eq!(features.electrode_count, 16);
        assert!(!features.has_gyro);
        assert!(!features.is_bipolar);

        info.model = DeviceModel::Unknown;
        assert_eq!(driver.get_device_features(&info), None);
    }

    #[test]
    fn test_rejection_injection() {
        fn ignore(_: f32, _: OpContext) {}
        fn ignore_connect(_: bool, _: OpContext) {}

        let driver = SimulatedDriver::new(SimulatorConfig::default()).unwrap();
        let handle = driver.open_session().unwrap();
        let ctx = OpContext { handle, index: 0 };
        driver.connect(handle, "sim", ignore_connect, ctx);

        driver.reject_next(Status::Unknown(0x42));
        assert_eq!(driver.get_latency(handle, ignore, ctx), Status::Unknown(0x42));
        assert_eq!(driver.get_latency(handle, ignore, ctx), Status::Ok);
    }
}
