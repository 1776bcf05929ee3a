// src/session/callbacks.rs
//! Driver callback trampolines
//!
//! Each trampoline resolves the handle through the registry, releases the
//! registry lock, then dispatches. Callbacks for handles that are no longer
//! registered are dropped silently.

use crate::acquisition::decoder::decode_tagged;
use crate::hal::types::{BatteryInfo, FullBatteryInfo, Handle, OpContext};
use crate::session::pending::Completion;
use crate::session::registry::SessionRegistry;
use crate::session::session::{SessionShared, SessionState};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

fn owner(handle: Handle) -> Option<Arc<SessionShared>> {
    let session = SessionRegistry::global().lookup(handle);
    if session.is_none() {
        trace!(%handle, "callback for unregistered session dropped");
    }
    session
}

/// Owner of `handle`, unless its connection has already ended
fn live_owner(handle: Handle) -> Option<Arc<SessionShared>> {
    let session = owner(handle)?;
    let state = *session.state.lock();
    if matches!(state, SessionState::Disconnected | SessionState::Destroyed) {
        trace!(%handle, ?state, "stale delivery after disconnect dropped");
        return None;
    }
    Some(session)
}

fn complete(ctx: OpContext, completion: Completion) {
    if let Some(session) = owner(ctx.handle) {
        session.pending.complete(ctx.index, completion);
    }
}

pub(crate) fn on_connected(success: bool, ctx: OpContext) {
    let Some(session) = owner(ctx.handle) else {
        return;
    };
    let next = if success {
        SessionState::Connected
    } else {
        SessionState::Disconnected
    };
    // a disconnect that raced the attempt has already settled the state
    if session.transition(SessionState::Connecting, next) {
        info!(handle = %ctx.handle, success, "connection attempt finished");
    }
    session
        .pending
        .complete(ctx.index, Completion::Connected(success));
}

pub(crate) fn on_stream_started(ctx: OpContext) {
    let Some(session) = owner(ctx.handle) else {
        return;
    };
    if session.transition(SessionState::Connected, SessionState::Streaming) {
        info!(handle = %ctx.handle, "stream started");
    }
    session.pending.complete(ctx.index, Completion::Done);
}

pub(crate) fn on_stream_stopped(ctx: OpContext) {
    let Some(session) = owner(ctx.handle) else {
        return;
    };
    if session.transition(SessionState::Streaming, SessionState::Connected) {
        info!(handle = %ctx.handle, "stream stopped");
    }
    session.pending.complete(ctx.index, Completion::Done);
}

pub(crate) fn on_done(ctx: OpContext) {
    complete(ctx, Completion::Done);
}

pub(crate) fn on_latency(seconds: f32, ctx: OpContext) {
    complete(ctx, Completion::Latency(seconds));
}

pub(crate) fn on_full_battery(info: FullBatteryInfo, ctx: OpContext) {
    complete(ctx, Completion::FullBattery(info));
}

pub(crate) fn on_chunk(buffers: &[&[u8]], count: usize, handle: Handle) {
    let Some(session) = live_owner(handle) else {
        return;
    };

    let mut guard = session.sinks.chunk.lock();
    let Some(sink) = guard.as_mut() else {
        return;
    };

    // the stream layout can change between deliveries
    let tags = session.driver.get_stream_channel_types(handle);
    match decode_tagged(&tags, buffers, count) {
        Ok(chunk) => {
            trace!(%handle, samples = count, channels = chunk.channel_count(), "chunk delivered");
            sink(chunk);
        }
        Err(err) => warn!(%handle, %err, "dropping undecodable chunk"),
    }
}

pub(crate) fn on_battery(info: BatteryInfo, handle: Handle) {
    let Some(session) = live_owner(handle) else {
        return;
    };
    let mut guard = session.sinks.battery.lock();
    if let Some(sink) = guard.as_mut() {
        sink(info);
    }
}

pub(crate) fn on_disconnect(handle: Handle) {
    let Some(session) = owner(handle) else {
        return;
    };

    let failed = session.mark_disconnected();
    info!(%handle, failed, "device disconnected");
    if failed > 0 {
        debug!(%handle, failed, "pending requests failed on disconnect");
    }

    let mut guard = session.sinks.disconnect.lock();
    if let Some(sink) = guard.as_mut() {
        sink();
    }
}
