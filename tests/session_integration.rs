// tests/session_integration.rs
//! Integration tests for sessions driven by the simulated driver

use crossbeam::channel::unbounded;
use eeg_core::acquisition::ChannelData;
use eeg_core::hal::channel;
use eeg_core::hal::simulator::{SimulatedDriver, SimulatorConfig};
use eeg_core::hal::{NativeError, Status};
use eeg_core::session::{Session, SessionError, SessionRegistry, SessionState};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

fn simulator() -> Arc<SimulatedDriver> {
    Arc::new(SimulatedDriver::new(SimulatorConfig::default()).expect("Failed to create simulator"))
}

fn connected(driver: &Arc<SimulatedDriver>) -> Session {
    let session = Session::new(driver.clone()).expect("Failed to open session");
    let result = session.connect("sim").expect("connect rejected").wait();
    assert_eq!(result, Ok(true));
    session
}

#[test]
fn test_connect_resolves_with_driver_verdict() {
    let driver = simulator();
    let session = Session::new(driver.clone()).unwrap();
    assert_eq!(session.state(), SessionState::Created);

    let pending = session.connect("sim").unwrap();
    assert_eq!(pending.wait(), Ok(true));
    assert_eq!(session.state(), SessionState::Connected);
    assert!(session.is_connected());
}

#[test]
fn test_refused_connection() {
    let driver = Arc::new(
        SimulatedDriver::new(SimulatorConfig {
            connect_succeeds: false,
            ..Default::default()
        })
        .unwrap(),
    );
    let session = Session::new(driver).unwrap();
    assert_eq!(session.connect("sim").unwrap().wait(), Ok(false));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn test_second_connect_while_connecting() {
    let driver = simulator();
    driver.hold_completions(true);
    let session = Session::new(driver.clone()).unwrap();

    let first = session.connect("sim").unwrap();
    assert_eq!(session.connect("sim").unwrap_err(), SessionError::ConnectInProgress);

    driver.hold_completions(false);
    assert_eq!(first.wait(), Ok(true));
}

#[test]
fn test_connect_rejected_while_connected() {
    let driver = simulator();
    let session = connected(&driver);
    assert_eq!(session.connect("sim").unwrap_err(), SessionError::AlreadyConnected);
    assert_eq!(session.state(), SessionState::Connected);

    session.set_channel_enabled(channel::SAMPLE_NUMBER, true);
    session.start_stream().unwrap().wait().unwrap();
    assert_eq!(session.connect("sim").unwrap_err(), SessionError::AlreadyConnected);
    assert_eq!(session.state(), SessionState::Streaming);

    // reconnecting after a drop is allowed
    session.disconnect();
    driver.sync();
    assert_eq!(session.connect("sim").unwrap().wait(), Ok(true));
}

#[test]
fn test_stream_calls_in_wrong_state_rejected() {
    let driver = simulator();
    let session = connected(&driver);

    let err = session.stop_stream().unwrap_err();
    assert!(err.is_immediate_rejection());
    assert!(matches!(err, SessionError::Native(NativeError::Unknown(_))));
    assert_eq!(session.state(), SessionState::Connected);

    session.start_stream().unwrap().wait().unwrap();
    assert!(session.start_stream().unwrap_err().is_immediate_rejection());
    assert_eq!(session.state(), SessionState::Streaming);
    assert_eq!(session.stop_stream().unwrap().wait(), Ok(()));
}

#[test]
fn test_destroy_cancels_connect_in_flight() {
    let driver = Arc::new(
        SimulatedDriver::new(SimulatorConfig {
            connect_succeeds: false,
            ..Default::default()
        })
        .unwrap(),
    );
    driver.hold_completions(true);
    let session = Session::new(driver.clone()).unwrap();
    let pending = session.connect("sim").unwrap();
    assert!(!session.is_connected());

    session.destroy();
    assert_eq!(driver.disconnect_requests(), 1);
    assert_eq!(driver.open_sessions(), 0);
    assert_eq!(pending.wait(), Err(SessionError::Disconnected));
}

#[test]
fn test_disconnect_during_connect_fails_attempt() {
    let driver = simulator();
    driver.hold_completions(true);
    let session = Session::new(driver.clone()).unwrap();

    let pending = session.connect("sim").unwrap();
    driver.drop_connection(session.handle());
    driver.sync();

    assert_eq!(pending.wait(), Err(SessionError::Disconnected));
    assert_eq!(session.state(), SessionState::Disconnected);

    // the late completion must not resurrect the connection
    driver.release_completions();
    driver.sync();
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn test_immediate_rejection_returns_error() {
    let driver = simulator();
    let session = Session::new(driver.clone()).unwrap();

    let err = session.start_stream().unwrap_err();
    assert_eq!(err, SessionError::Native(NativeError::Connection));
    assert!(err.is_immediate_rejection());

    drop(session);
    let session = connected(&driver);
    driver.reject_next(Status::UnsupportedDevice);
    assert_eq!(
        session.get_latency().unwrap_err(),
        SessionError::Native(NativeError::UnsupportedDevice)
    );

    // a rejected request leaves nothing behind; the next one succeeds
    let latency = session.get_latency().unwrap().wait().unwrap();
    assert!((latency - 0.02).abs() < f32::EPSILON);
}

#[test]
fn test_async_operations_complete() {
    let driver = simulator();
    let session = connected(&driver);

    assert_eq!(session.set_io(0, true).unwrap().wait(), Ok(()));
    assert_eq!(
        session.set_io(9, true).unwrap_err(),
        SessionError::Native(NativeError::UnsupportedDevice)
    );

    let battery = session.get_full_battery_info().unwrap().wait().unwrap();
    assert_eq!(battery.level, session.get_battery_info().level);

    let info = session.get_device_info();
    assert_eq!(info.serial_number, driver.config().serial_number);
    assert_eq!(session.get_sample_frequency(), 250);

    let features = session.get_device_features().unwrap();
    assert_eq!(u16::from(features.electrode_count), driver.config().electrode_count);
    assert_eq!(features.contacts_per_electrode(), 1);
}

#[test]
fn test_disconnect_fails_every_pending_request() {
    let driver = simulator();
    let session = connected(&driver);
    driver.hold_completions(true);

    let latency = session.get_latency().unwrap();
    let io = session.set_io(1, false).unwrap();
    session.disconnect();

    assert_eq!(latency.wait(), Err(SessionError::Disconnected));
    assert_eq!(io.wait(), Err(SessionError::Disconnected));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(!session.is_connected());
}

#[test]
fn test_try_result_and_timeout() {
    let driver = simulator();
    let session = connected(&driver);
    driver.hold_completions(true);

    let pending = session.get_latency().unwrap();
    assert!(pending.try_result().is_none());
    assert!(pending.wait_timeout(Duration::from_millis(20)).is_none());

    driver.release_completions();
    let result = pending.wait_timeout(Duration::from_secs(5));
    assert!(matches!(result, Some(Ok(_))));
    assert!(pending.is_ready());
}

#[test]
fn test_stream_delivers_decoded_chunks() {
    let driver = simulator();
    let session = connected(&driver);

    session.set_channel_enabled(channel::SAMPLE_NUMBER, true);
    session.set_channel_enabled(channel::electrode(0), true);
    session.set_channel_enabled(channel::ELECTRODE_CONTACT, true);

    let (tx, rx) = unbounded();
    session.set_chunk_sink(Some(Box::new(move |chunk| {
        let _ = tx.send(chunk);
    })));

    assert_eq!(session.start_stream().unwrap().wait(), Ok(()));
    assert_eq!(session.state(), SessionState::Streaming);
    assert_eq!(session.get_channel_index(channel::SAMPLE_NUMBER), Ok(0));
    assert_eq!(
        session.get_channel_index(channel::GYROSCOPE),
        Err(SessionError::ChannelNotActive(channel::GYROSCOPE))
    );

    driver.emit_chunk(session.handle(), 10);
    driver.emit_chunk(session.handle(), 5);
    driver.sync();

    let first = rx.try_recv().expect("first chunk");
    let second = rx.try_recv().expect("second chunk");
    assert_eq!(first.channel_count(), 3);
    assert_eq!(first.samples(), 10);
    assert_eq!(first.channel(0), Some(&ChannelData::Count((0..10).collect())));
    assert_eq!(first.channel(2), Some(&ChannelData::Bool(vec![true; 10])));
    assert_eq!(second.channel(0), Some(&ChannelData::Count((10..15).collect())));

    assert_eq!(session.stop_stream().unwrap().wait(), Ok(()));
    assert_eq!(session.state(), SessionState::Connected);
}

#[test]
fn test_removed_sink_receives_nothing() {
    let driver = simulator();
    let session = connected(&driver);
    session.set_channel_enabled(channel::SAMPLE_NUMBER, true);

    let (tx, rx) = unbounded();
    session.set_chunk_sink(Some(Box::new(move |chunk| {
        let _ = tx.send(chunk);
    })));
    session.start_stream().unwrap().wait().unwrap();
    session.set_chunk_sink(None);

    driver.emit_chunk(session.handle(), 4);
    driver.sync();
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_battery_and_disconnect_sinks() {
    let driver = simulator();
    let session = connected(&driver);

    let (battery_tx, battery_rx) = unbounded();
    session.set_battery_sink(Some(Box::new(move |info| {
        let _ = battery_tx.send(info);
    })));
    let (gone_tx, gone_rx) = unbounded();
    session.set_disconnect_sink(Some(Box::new(move || {
        let _ = gone_tx.send(());
    })));

    driver.emit_battery(session.handle());
    driver.drop_connection(session.handle());
    driver.sync();

    assert_eq!(battery_rx.try_recv().unwrap(), driver.config().battery);
    assert!(gone_rx.try_recv().is_ok());
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn test_annotations_use_sample_clock() {
    let driver = simulator();
    let session = connected(&driver);
    session.set_channel_enabled(channel::SAMPLE_NUMBER, true);
    session.start_stream().unwrap().wait().unwrap();

    driver.emit_chunk(session.handle(), 40);
    driver.sync();
    session.annotate("stimulus");

    let annotations = session.get_annotations();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].timestamp, 40);
    assert_eq!(annotations[0].text, "stimulus");

    session.clear_annotations();
    assert!(session.get_annotations().is_empty());
}

#[test]
#[serial]
fn test_destroyed_session_ignores_late_callbacks() {
    let driver = simulator();
    let session = connected(&driver);
    let handle = session.handle();
    assert!(SessionRegistry::global().contains(handle));

    session.set_channel_enabled(channel::SAMPLE_NUMBER, true);
    let (tx, rx) = unbounded();
    session.set_chunk_sink(Some(Box::new(move |chunk| {
        let _ = tx.send(chunk);
    })));
    session.start_stream().unwrap().wait().unwrap();

    session.destroy();
    assert!(!SessionRegistry::global().contains(handle));
    assert_eq!(driver.open_sessions(), 0);

    driver.emit_chunk(handle, 8);
    driver.drop_connection(handle);
    driver.sync();
    assert!(rx.try_recv().is_err());
}

#[test]
#[serial]
fn test_registry_tracks_live_sessions() {
    let driver = simulator();
    let registry = SessionRegistry::global();

    let a = Session::new(driver.clone()).unwrap();
    let b = Session::new(driver.clone()).unwrap();
    let (ha, hb) = (a.handle(), b.handle());
    assert_ne!(ha, hb);
    assert!(registry.contains(ha) && registry.contains(hb));
    assert!(!registry.is_empty());

    drop(a);
    assert!(!registry.contains(ha));
    assert!(registry.contains(hb));
    drop(b);
    assert!(!registry.contains(hb));
    assert_eq!(driver.open_sessions(), 0);
}

#[tokio::test]
async fn test_pending_results_can_be_awaited() {
    let driver = simulator();
    let session = Session::new(driver.clone()).unwrap();

    assert_eq!(session.connect("sim").unwrap().await, Ok(true));
    let latency = session.get_latency().unwrap().await.unwrap();
    assert!(latency > 0.0);

    let result = tokio::time::timeout(Duration::from_secs(5), session.set_io(0, true).unwrap()).await;
    assert_eq!(result.expect("set_io timed out"), Ok(()));
}
