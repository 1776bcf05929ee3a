// src/hal/traits.rs
//! Driver boundary: the narrow, handle-based interface exposed by the native library
//!
//! Every method mirrors one native entry point. Callbacks are plain function
//! pointers with a fixed signature; the only state they receive is the context
//! value passed alongside them, so the session layer routes them back to their
//! owner through the session registry.

use crate::hal::types::{
    Annotation, BatteryInfo, DeviceFeatures, DeviceInfo, FullBatteryInfo, GainMode, Handle,
    ImpedanceMode, OpContext, Polarity, Status,
};

/// Completion of an operation with no payload (stream start/stop, set-IO)
pub type DoneCallback = fn(OpContext);

/// Completion of a connection attempt
pub type ConnectCallback = fn(bool, OpContext);

/// Completion of a latency measurement, in seconds
pub type LatencyCallback = fn(f32, OpContext);

/// Completion of an extended battery query
pub type FullBatteryCallback = fn(FullBatteryInfo, OpContext);

/// Streaming delivery: one raw byte buffer per channel, `count` samples each
pub type ChunkCallback = fn(&[&[u8]], usize, Handle);

/// Battery status push
pub type BatteryCallback = fn(BatteryInfo, Handle);

/// Connection loss notification; the last event delivered for a connection
pub type DisconnectCallback = fn(Handle);

/// Black-box acquisition driver.
///
/// Implementations may invoke callbacks from any thread, including
/// synchronously from inside the call that registered them.
pub trait Driver: Send + Sync {
    /// Allocate a native session; `None` when the driver refuses
    fn open_session(&self) -> Option<Handle>;

    /// Release a native session. The handle is invalid afterwards.
    fn close_session(&self, handle: Handle);

    /// Start connecting to `address`; completion arrives through `on_done`
    fn connect(&self, handle: Handle, address: &str, on_done: ConnectCallback, ctx: OpContext);

    /// Drop the connection if there is one
    fn disconnect(&self, handle: Handle);

    fn is_connected(&self, handle: Handle) -> bool;

    fn start_stream(&self, handle: Handle, on_done: DoneCallback, ctx: OpContext) -> Status;

    fn stop_stream(&self, handle: Handle, on_done: DoneCallback, ctx: OpContext) -> Status;

    fn is_streaming(&self, handle: Handle) -> bool;

    fn set_io(
        &self,
        handle: Handle,
        pin: u8,
        state: bool,
        on_done: DoneCallback,
        ctx: OpContext,
    ) -> Status;

    fn get_battery_info(&self, handle: Handle) -> BatteryInfo;

    fn get_full_battery_info(
        &self,
        handle: Handle,
        on_done: FullBatteryCallback,
        ctx: OpContext,
    ) -> Status;

    fn get_latency(&self, handle: Handle, on_done: LatencyCallback, ctx: OpContext) -> Status;

    fn set_channel_enabled(&self, handle: Handle, channel: u16, enabled: bool);

    fn set_channel_gain(&self, handle: Handle, channel: u16, gain: GainMode);

    fn set_channel_bias(&self, handle: Handle, channel: u16, polarity: Polarity);

    fn set_impedance_mode(&self, handle: Handle, mode: ImpedanceMode);

    fn get_device_info(&self, handle: Handle) -> DeviceInfo;

    /// Capabilities of the model described by `info`; the serial number is
    /// ignored. `None` for models the driver does not know.
    fn get_device_features(&self, info: &DeviceInfo) -> Option<DeviceFeatures>;

    /// Position of `channel` inside delivered chunks; `None` when the channel
    /// is not part of the running stream
    fn get_channel_index(&self, handle: Handle, channel: u16) -> Option<usize>;

    fn get_sample_frequency(&self, handle: Handle) -> u16;

    /// Raw type tags for every column of the current stream configuration
    fn get_stream_channel_types(&self, handle: Handle) -> Vec<u8>;

    fn set_chunk_callback(&self, handle: Handle, callback: Option<ChunkCallback>);

    fn set_battery_callback(&self, handle: Handle, callback: Option<BatteryCallback>);

    fn set_disconnect_callback(&self, handle: Handle, callback: Option<DisconnectCallback>);

    /// Record an annotation at the current sample number
    fn annotate(&self, handle: Handle, text: &str);

    fn get_annotations(&self, handle: Handle) -> Vec<Annotation>;

    fn clear_annotations(&self, handle: Handle);
}
