// src/hal/native.rs
//! Binding to the vendor core library (`bacore`)
//!
//! Only compiled with the `native` feature. [`NativeDriver`] implements
//! [`Driver`] on top of the raw `ba_eeg_manager_*` entry points; the native
//! manager pointer doubles as the session [`Handle`].

use crate::acquisition::channel_types::ChannelType;
use crate::hal::traits::{
    BatteryCallback, ChunkCallback, ConnectCallback, DisconnectCallback, DoneCallback, Driver,
    FullBatteryCallback, LatencyCallback,
};
use crate::hal::types::{
    Annotation, BatteryInfo, DeviceFeatures, DeviceInfo, DeviceModel, FullBatteryInfo, GainMode,
    Handle, ImpedanceMode, OpContext, Polarity, Status, Version,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr;
use thiserror::Error;
use tracing::{debug, warn};

#[repr(C)]
#[derive(Debug, Copy, Clone)]
#[doc(hidden)]
pub struct RawVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
#[doc(hidden)]
pub struct RawDeviceInfo {
    pub model: u8,
    pub hardware_version: RawVersion,
    pub firmware_version: RawVersion,
    pub serial_number: usize,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
#[doc(hidden)]
pub struct RawBatteryInfo {
    pub level: u8,
    pub is_charger_connected: bool,
    pub is_charging: bool,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
#[doc(hidden)]
pub struct RawFullBatteryInfo {
    pub is_charging: bool,
    pub is_charger_connected: bool,
    pub level: u8,
    pub health: f32,
    pub voltage: f32,
    pub current: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
#[doc(hidden)]
pub struct RawAnnotation {
    pub timestamp: usize,
    pub text: *const c_char,
}

type RawDone = extern "C" fn(*mut c_void);
type RawConnect = extern "C" fn(bool, *mut c_void);
type RawLatency = extern "C" fn(f32, *mut c_void);
type RawFullBattery = extern "C" fn(*const RawFullBatteryInfo, *mut c_void);
type RawChunk = extern "C" fn(*const *const c_void, usize, *mut c_void);
type RawBattery = extern "C" fn(*const RawBatteryInfo, *mut c_void);
type RawDisconnect = extern "C" fn(*mut c_void);

#[allow(dead_code)]
#[doc(hidden)]
#[link(name = "bacore")]
extern "C" {
    // LIBRARY ------------------------------------------------------------- //
    pub fn ba_core_init(expected: *const RawVersion) -> i32;
    pub fn ba_core_close();
    pub fn ba_core_get_version() -> *const RawVersion;

    // DEVICE FEATURES ----------------------------------------------------- //
    pub fn ba_core_device_features_get(info: *const RawDeviceInfo) -> *const c_void;
    pub fn ba_core_device_features_has_gyro(features: *const c_void) -> bool;
    pub fn ba_core_device_features_is_bipolar(features: *const c_void) -> bool;
    pub fn ba_core_device_features_electrode_count(features: *const c_void) -> u8;

    // MANAGER LIFETIME ---------------------------------------------------- //
    pub fn ba_eeg_manager_new() -> *mut c_void;
    pub fn ba_eeg_manager_free(manager: *mut c_void);

    // CONNECTION ---------------------------------------------------------- //
    pub fn ba_eeg_manager_connect(
        manager: *mut c_void,
        port: *const c_char,
        callback: RawConnect,
        data: *mut c_void,
    );
    pub fn ba_eeg_manager_is_connected(manager: *mut c_void) -> bool;
    pub fn ba_eeg_manager_disconnect(manager: *mut c_void);

    // STREAMING ----------------------------------------------------------- //
    pub fn ba_eeg_manager_start_stream(manager: *mut c_void, callback: RawDone, data: *mut c_void)
        -> u8;
    pub fn ba_eeg_manager_stop_stream(manager: *mut c_void, callback: RawDone, data: *mut c_void)
        -> u8;
    pub fn ba_eeg_manager_is_streaming(manager: *mut c_void) -> bool;

    // DEVICE QUERIES ------------------------------------------------------ //
    pub fn ba_eeg_manager_set_io(
        manager: *mut c_void,
        pin: u8,
        state: bool,
        callback: RawDone,
        data: *mut c_void,
    ) -> u8;
    pub fn ba_eeg_manager_get_battery_info(manager: *mut c_void) -> RawBatteryInfo;
    pub fn ba_eeg_manager_get_full_battery_info(
        manager: *mut c_void,
        callback: RawFullBattery,
        data: *mut c_void,
    ) -> u8;
    pub fn ba_eeg_manager_get_latency(
        manager: *mut c_void,
        callback: RawLatency,
        data: *mut c_void,
    ) -> u8;
    pub fn ba_eeg_manager_get_device_info(manager: *mut c_void) -> *const RawDeviceInfo;
    pub fn ba_eeg_manager_get_sample_frequency(manager: *mut c_void) -> u16;

    // STREAM CONFIGURATION ------------------------------------------------ //
    pub fn ba_eeg_manager_set_channel_enabled(manager: *mut c_void, channel: u16, state: bool);
    pub fn ba_eeg_manager_set_channel_gain(manager: *mut c_void, channel: u16, gain: u8);
    pub fn ba_eeg_manager_set_channel_bias(manager: *mut c_void, channel: u16, polarity: u8);
    pub fn ba_eeg_manager_set_impedance_mode(manager: *mut c_void, mode: u8);
    pub fn ba_eeg_manager_get_channel_index(manager: *mut c_void, channel: u16) -> usize;
    pub fn ba_eeg_manager_get_stream_channel_data_types(
        manager: *mut c_void,
        types: *mut *const u8,
        size: *mut usize,
    );

    // PUSH CALLBACKS ------------------------------------------------------ //
    pub fn ba_eeg_manager_set_callback_chunk(
        manager: *mut c_void,
        callback: Option<RawChunk>,
        data: *mut c_void,
    );
    pub fn ba_eeg_manager_set_callback_battery(
        manager: *mut c_void,
        callback: Option<RawBattery>,
        data: *mut c_void,
    );
    pub fn ba_eeg_manager_set_callback_disconnect(
        manager: *mut c_void,
        callback: Option<RawDisconnect>,
        data: *mut c_void,
    );

    // ANNOTATIONS --------------------------------------------------------- //
    pub fn ba_eeg_manager_annotate(manager: *mut c_void, text: *const c_char);
    pub fn ba_eeg_manager_get_annotations(
        manager: *mut c_void,
        annotations: *mut *const RawAnnotation,
        size: *mut usize,
    );
    pub fn ba_eeg_manager_clear_annotations(manager: *mut c_void);
}

/// Library initialisation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("core library already initialized")]
    AlreadyInitialized,
    #[error("core configuration contains a setting with the wrong type")]
    ConfigType,
    #[error("core configuration cannot be parsed")]
    ConfigParse,
    #[error("core library version is incompatible")]
    Incompatible,
    #[error("unknown core initialisation error {0}")]
    Unknown(i32),
}

impl From<Version> for RawVersion {
    fn from(v: Version) -> Self {
        Self { major: v.major, minor: v.minor, patch: v.patch }
    }
}

impl From<RawVersion> for Version {
    fn from(v: RawVersion) -> Self {
        Version::new(v.major, v.minor, v.patch)
    }
}

impl From<&DeviceInfo> for RawDeviceInfo {
    fn from(info: &DeviceInfo) -> Self {
        Self {
            model: info.model.code(),
            hardware_version: info.hardware_version.into(),
            firmware_version: info.firmware_version.into(),
            serial_number: info.serial_number as usize,
        }
    }
}

/// Installed library version
pub fn core_version() -> Option<Version> {
    // SAFETY: the library returns a pointer to a static version or null
    unsafe { ba_core_get_version().as_ref().map(|v| Version::from(*v)) }
}

/// Initialise the core library. Call once, before any session is opened.
pub fn init(expected: Version) -> Result<(), InitError> {
    if let Some(actual) = core_version() {
        if !actual.is_compatible_with(&expected) {
            return Err(InitError::Incompatible);
        }
    }
    let raw = RawVersion::from(expected);
    // SAFETY: `raw` outlives the call
    match unsafe { ba_core_init(&raw) } {
        0 => {
            debug!(%expected, "core library initialized");
            Ok(())
        }
        1 => Err(InitError::AlreadyInitialized),
        2 => Err(InitError::ConfigType),
        3 => Err(InitError::ConfigParse),
        code => Err(InitError::Unknown(code)),
    }
}

/// Initialise the core library against the version this crate targets
pub fn init_default() -> Result<(), InitError> {
    init(crate::config::constants::library::EXPECTED_CORE_VERSION)
}

/// Shut the core library down. Every session must be destroyed first.
pub fn close() {
    // SAFETY: no arguments; the caller guarantees no session is alive
    unsafe { ba_core_close() }
}

// One-shot completions: the context travels boxed through the native call
// and is reclaimed by exactly one of the thunk or the rejection path.

struct Op<C> {
    callback: C,
    ctx: OpContext,
}

fn into_data<C>(callback: C, ctx: OpContext) -> *mut c_void {
    Box::into_raw(Box::new(Op { callback, ctx })).cast()
}

/// # Safety
/// `data` must come from `into_data::<C>` and not have been reclaimed yet
unsafe fn reclaim<C>(data: *mut c_void) -> Op<C> {
    *Box::from_raw(data.cast::<Op<C>>())
}

extern "C" fn done_thunk(data: *mut c_void) {
    // SAFETY: registered with `into_data::<DoneCallback>`
    let op = unsafe { reclaim::<DoneCallback>(data) };
    (op.callback)(op.ctx);
}

extern "C" fn connect_thunk(success: bool, data: *mut c_void) {
    // SAFETY: registered with `into_data::<ConnectCallback>`
    let op = unsafe { reclaim::<ConnectCallback>(data) };
    (op.callback)(success, op.ctx);
}

extern "C" fn latency_thunk(seconds: f32, data: *mut c_void) {
    // SAFETY: registered with `into_data::<LatencyCallback>`
    let op = unsafe { reclaim::<LatencyCallback>(data) };
    (op.callback)(seconds, op.ctx);
}

extern "C" fn full_battery_thunk(info: *const RawFullBatteryInfo, data: *mut c_void) {
    // SAFETY: registered with `into_data::<FullBatteryCallback>`
    let op = unsafe { reclaim::<FullBatteryCallback>(data) };
    // SAFETY: the library passes a valid pointer for the duration of the call
    let info = unsafe { info.as_ref() }.map(|raw| FullBatteryInfo {
        is_charging: raw.is_charging,
        is_charger_connected: raw.is_charger_connected,
        level: raw.level,
        health: raw.health,
        voltage: raw.voltage,
        current: raw.current,
    });
    (op.callback)(info.unwrap_or_default(), op.ctx);
}

// Push callbacks: one boxed route per handle and callback. Routes stay
// allocated until the session closes, so a delivery still running on the
// driver thread never observes a freed route after a callback swap.

struct Route<C> {
    callback: C,
    handle: Handle,
}

#[derive(Default)]
struct Routes {
    chunk: HashMap<usize, Box<Route<ChunkCallback>>>,
    battery: HashMap<usize, Box<Route<BatteryCallback>>>,
    disconnect: HashMap<usize, Box<Route<DisconnectCallback>>>,
}

/// Route for `callback`, allocated on first use; `key` is the callback address
fn retain_route<C>(
    routes: &mut HashMap<usize, Box<Route<C>>>,
    key: usize,
    callback: C,
    handle: Handle,
) -> *mut c_void {
    let route = routes
        .entry(key)
        .or_insert_with(|| Box::new(Route { callback, handle }));
    (route.as_ref() as *const Route<C>).cast_mut().cast()
}

extern "C" fn chunk_thunk(buffers: *const *const c_void, count: usize, data: *mut c_void) {
    // SAFETY: `data` points at a live `Route<ChunkCallback>` held by the driver
    let Some(route) = (unsafe { data.cast::<Route<ChunkCallback>>().as_ref() }) else {
        return;
    };
    let tags = stream_types(manager(route.handle));
    let widths: Option<Vec<usize>> = tags
        .iter()
        .map(|&tag| ChannelType::from_tag(tag).map(ChannelType::width))
        .collect();
    let Some(widths) = widths else {
        warn!(handle = %route.handle, ?tags, "chunk with unknown channel type dropped");
        return;
    };
    if buffers.is_null() && !widths.is_empty() {
        return;
    }

    let Some(lengths) = widths
        .iter()
        .map(|width| width.checked_mul(count))
        .collect::<Option<Vec<usize>>>()
    else {
        warn!(handle = %route.handle, count, "chunk with impossible sample count dropped");
        return;
    };

    let views: Vec<&[u8]> = lengths
        .iter()
        .enumerate()
        .map(|(i, &len)| {
            // SAFETY: one buffer per stream channel holding `count` values of
            // the channel's type, valid for the duration of the callback
            unsafe {
                let column = *buffers.add(i);
                if column.is_null() {
                    &[][..]
                } else {
                    std::slice::from_raw_parts(column.cast::<u8>(), len)
                }
            }
        })
        .collect();
    (route.callback)(&views, count, route.handle);
}

extern "C" fn battery_thunk(info: *const RawBatteryInfo, data: *mut c_void) {
    // SAFETY: `data` points at a live `Route<BatteryCallback>` held by the driver
    let Some(route) = (unsafe { data.cast::<Route<BatteryCallback>>().as_ref() }) else {
        return;
    };
    // SAFETY: valid for the duration of the call
    if let Some(raw) = unsafe { info.as_ref() } {
        let info = BatteryInfo {
            level: raw.level,
            is_charger_connected: raw.is_charger_connected,
            is_charging: raw.is_charging,
        };
        (route.callback)(info, route.handle);
    }
}

extern "C" fn disconnect_thunk(data: *mut c_void) {
    // SAFETY: `data` points at a live `Route<DisconnectCallback>` held by the driver
    if let Some(route) = unsafe { data.cast::<Route<DisconnectCallback>>().as_ref() } {
        (route.callback)(route.handle);
    }
}

fn manager(handle: Handle) -> *mut c_void {
    handle.as_raw() as *mut c_void
}

fn stream_types(manager: *mut c_void) -> Vec<u8> {
    let mut types: *const u8 = ptr::null();
    let mut size = 0usize;
    // SAFETY: out-pointers are valid; the returned array is owned by the library
    unsafe {
        ba_eeg_manager_get_stream_channel_data_types(manager, &mut types, &mut size);
        if types.is_null() {
            return Vec::new();
        }
        std::slice::from_raw_parts(types, size).to_vec()
    }
}

/// [`Driver`] backed by the vendor core library.
///
/// [`init`] must have succeeded before the first session is opened.
#[derive(Default)]
pub struct NativeDriver {
    routes: Mutex<HashMap<Handle, Routes>>,
}

impl NativeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn status(
        operation: &'static str,
        code: u8,
        data: *mut c_void,
        reclaim_op: unsafe fn(*mut c_void),
    ) -> Status {
        let status = Status::from_code(code);
        if status != Status::Ok {
            // rejected calls never invoke their callback
            // SAFETY: `data` was produced by `into_data` for this call
            unsafe { reclaim_op(data) };
            debug!(operation, ?status, "native call rejected");
        }
        status
    }
}

unsafe fn drop_op<C>(data: *mut c_void) {
    drop(reclaim::<C>(data));
}

impl Driver for NativeDriver {
    fn open_session(&self) -> Option<Handle> {
        // SAFETY: no preconditions beyond library initialisation
        let raw = unsafe { ba_eeg_manager_new() };
        let handle = Handle::from_raw(raw as usize)?;
        self.routes.lock().insert(handle, Routes::default());
        Some(handle)
    }

    fn close_session(&self, handle: Handle) {
        // SAFETY: `handle` came from `open_session`; routes are dropped after
        // the manager so no callback can observe a freed route
        unsafe { ba_eeg_manager_free(manager(handle)) };
        self.routes.lock().remove(&handle);
    }

    fn connect(&self, handle: Handle, address: &str, on_done: ConnectCallback, ctx: OpContext) {
        let Ok(port) = CString::new(address) else {
            warn!(%handle, "address contains a NUL byte");
            on_done(false, ctx);
            return;
        };
        let data = into_data(on_done, ctx);
        // SAFETY: the library copies `port`; `data` is reclaimed by the thunk
        unsafe { ba_eeg_manager_connect(manager(handle), port.as_ptr(), connect_thunk, data) };
    }

    fn disconnect(&self, handle: Handle) {
        // SAFETY: valid manager
        unsafe { ba_eeg_manager_disconnect(manager(handle)) }
    }

    fn is_connected(&self, handle: Handle) -> bool {
        // SAFETY: valid manager
        unsafe { ba_eeg_manager_is_connected(manager(handle)) }
    }

    fn start_stream(&self, handle: Handle, on_done: DoneCallback, ctx: OpContext) -> Status {
        let data = into_data(on_done, ctx);
        // SAFETY: valid manager; `data` ownership handled by `status`
        let code = unsafe { ba_eeg_manager_start_stream(manager(handle), done_thunk, data) };
        Self::status("start_stream", code, data, drop_op::<DoneCallback>)
    }

    fn stop_stream(&self, handle: Handle, on_done: DoneCallback, ctx: OpContext) -> Status {
        let data = into_data(on_done, ctx);
        // SAFETY: as above
        let code = unsafe { ba_eeg_manager_stop_stream(manager(handle), done_thunk, data) };
        Self::status("stop_stream", code, data, drop_op::<DoneCallback>)
    }

    fn is_streaming(&self, handle: Handle) -> bool {
        // SAFETY: valid manager
        unsafe { ba_eeg_manager_is_streaming(manager(handle)) }
    }

    fn set_io(
        &self,
        handle: Handle,
        pin: u8,
        state: bool,
        on_done: DoneCallback,
        ctx: OpContext,
    ) -> Status {
        let data = into_data(on_done, ctx);
        // SAFETY: as above
        let code = unsafe { ba_eeg_manager_set_io(manager(handle), pin, state, done_thunk, data) };
        Self::status("set_io", code, data, drop_op::<DoneCallback>)
    }

    fn get_battery_info(&self, handle: Handle) -> BatteryInfo {
        // SAFETY: valid manager; returned by value
        let raw = unsafe { ba_eeg_manager_get_battery_info(manager(handle)) };
        BatteryInfo {
            level: raw.level,
            is_charger_connected: raw.is_charger_connected,
            is_charging: raw.is_charging,
        }
    }

    fn get_full_battery_info(
        &self,
        handle: Handle,
        on_done: FullBatteryCallback,
        ctx: OpContext,
    ) -> Status {
        let data = into_data(on_done, ctx);
        // SAFETY: as above
        let code = unsafe {
            ba_eeg_manager_get_full_battery_info(manager(handle), full_battery_thunk, data)
        };
        Self::status("get_full_battery_info", code, data, drop_op::<FullBatteryCallback>)
    }

    fn get_latency(&self, handle: Handle, on_done: LatencyCallback, ctx: OpContext) -> Status {
        let data = into_data(on_done, ctx);
        // SAFETY: as above
        let code = unsafe { ba_eeg_manager_get_latency(manager(handle), latency_thunk, data) };
        Self::status("get_latency", code, data, drop_op::<LatencyCallback>)
    }

    fn set_channel_enabled(&self, handle: Handle, channel: u16, enabled: bool) {
        // SAFETY: valid manager
        unsafe { ba_eeg_manager_set_channel_enabled(manager(handle), channel, enabled) }
    }

    fn set_channel_gain(&self, handle: Handle, channel: u16, gain: GainMode) {
        // SAFETY: valid manager
        unsafe { ba_eeg_manager_set_channel_gain(manager(handle), channel, gain.code()) }
    }

    fn set_channel_bias(&self, handle: Handle, channel: u16, polarity: Polarity) {
        // SAFETY: valid manager
        unsafe { ba_eeg_manager_set_channel_bias(manager(handle), channel, polarity.code()) }
    }

    fn set_impedance_mode(&self, handle: Handle, mode: ImpedanceMode) {
        // SAFETY: valid manager
        unsafe { ba_eeg_manager_set_impedance_mode(manager(handle), mode.code()) }
    }

    fn get_device_info(&self, handle: Handle) -> DeviceInfo {
        // SAFETY: the library returns a pointer into the manager or null
        let raw = unsafe { ba_eeg_manager_get_device_info(manager(handle)).as_ref().copied() };
        match raw {
            Some(raw) => DeviceInfo {
                model: DeviceModel::from_code(raw.model),
                hardware_version: raw.hardware_version.into(),
                firmware_version: raw.firmware_version.into(),
                serial_number: raw.serial_number as u64,
            },
            None => DeviceInfo {
                model: DeviceModel::Unknown,
                hardware_version: Version::default(),
                firmware_version: Version::default(),
                serial_number: 0,
            },
        }
    }

    fn get_device_features(&self, info: &DeviceInfo) -> Option<DeviceFeatures> {
        let raw = RawDeviceInfo::from(info);
        // SAFETY: `raw` outlives the call; the library returns a pointer to a
        // static feature table or null for unknown models
        unsafe {
            let features = ba_core_device_features_get(&raw);
            if features.is_null() {
                return None;
            }
            Some(DeviceFeatures {
                has_gyro: ba_core_device_features_has_gyro(features),
                is_bipolar: ba_core_device_features_is_bipolar(features),
                electrode_count: ba_core_device_features_electrode_count(features),
            })
        }
    }

    fn get_channel_index(&self, handle: Handle, channel: u16) -> Option<usize> {
        // SAFETY: valid manager
        let index = unsafe { ba_eeg_manager_get_channel_index(manager(handle), channel) };
        (index != usize::MAX).then_some(index)
    }

    fn get_sample_frequency(&self, handle: Handle) -> u16 {
        // SAFETY: valid manager
        unsafe { ba_eeg_manager_get_sample_frequency(manager(handle)) }
    }

    fn get_stream_channel_types(&self, handle: Handle) -> Vec<u8> {
        stream_types(manager(handle))
    }

    fn set_chunk_callback(&self, handle: Handle, callback: Option<ChunkCallback>) {
        let data = callback.and_then(|callback| {
            let mut routes = self.routes.lock();
            let routes = routes.get_mut(&handle)?;
            Some(retain_route(&mut routes.chunk, callback as usize, callback, handle))
        });
        let thunk = data.map(|_| chunk_thunk as RawChunk);
        // SAFETY: routes stay allocated until `close_session` frees the manager
        unsafe {
            ba_eeg_manager_set_callback_chunk(
                manager(handle),
                thunk,
                data.unwrap_or(ptr::null_mut()),
            )
        };
    }

    fn set_battery_callback(&self, handle: Handle, callback: Option<BatteryCallback>) {
        let data = callback.and_then(|callback| {
            let mut routes = self.routes.lock();
            let routes = routes.get_mut(&handle)?;
            Some(retain_route(&mut routes.battery, callback as usize, callback, handle))
        });
        let thunk = data.map(|_| battery_thunk as RawBattery);
        // SAFETY: as above
        unsafe {
            ba_eeg_manager_set_callback_battery(
                manager(handle),
                thunk,
                data.unwrap_or(ptr::null_mut()),
            )
        };
    }

    fn set_disconnect_callback(&self, handle: Handle, callback: Option<DisconnectCallback>) {
        let data = callback.and_then(|callback| {
            let mut routes = self.routes.lock();
            let routes = routes.get_mut(&handle)?;
            Some(retain_route(&mut routes.disconnect, callback as usize, callback, handle))
        });
        let thunk = data.map(|_| disconnect_thunk as RawDisconnect);
        // SAFETY: as above
        unsafe {
            ba_eeg_manager_set_callback_disconnect(
                manager(handle),
                thunk,
                data.unwrap_or(ptr::null_mut()),
            )
        };
    }

    fn annotate(&self, handle: Handle, text: &str) {
        let Ok(text) = CString::new(text) else {
            warn!(%handle, "annotation contains a NUL byte, ignored");
            return;
        };
        // SAFETY: the library copies the string
        unsafe { ba_eeg_manager_annotate(manager(handle), text.as_ptr()) }
    }

    fn get_annotations(&self, handle: Handle) -> Vec<Annotation> {
        let mut annotations: *const RawAnnotation = ptr::null();
        let mut size = 0usize;
        // SAFETY: out-pointers are valid; the array stays owned by the library
        unsafe {
            ba_eeg_manager_get_annotations(manager(handle), &mut annotations, &mut size);
            if annotations.is_null() {
                return Vec::new();
            }
            std::slice::from_raw_parts(annotations, size)
                .iter()
                .map(|raw| {
                    let text = if raw.text.is_null() {
                        String::new()
                    } else {
                        CStr::from_ptr(raw.text).to_string_lossy().into_owned()
                    };
                    Annotation::new(raw.timestamp as u64, text)
                })
                .collect()
        }
    }

    fn clear_annotations(&self, handle: Handle) {
        // SAFETY: valid manager
        unsafe { ba_eeg_manager_clear_annotations(manager(handle)) }
    }
}
