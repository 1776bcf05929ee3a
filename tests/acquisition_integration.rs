// tests/acquisition_integration.rs
//! Integration tests for buffering, snapshots and the acquisition controller

use eeg_core::acquisition::{
    Acquisition, AcquisitionBuffer, BufferError, BufferMode, ChannelData, Chunk, Window,
};
use eeg_core::config::{AcquisitionConfig, BufferModeConfig};
use eeg_core::hal::simulator::{SimulatedDriver, SimulatorConfig};
use eeg_core::hal::Annotation;
use ndarray::Array2;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn sample_chunk(first: u64, count: usize) -> Chunk {
    Chunk::from_channels(vec![
        ChannelData::Float(vec![1.5; count]),
        ChannelData::Count((first..first + count as u64).collect()),
    ])
    .expect("equal-length columns")
}

#[test]
fn test_annotation_onsets_follow_window() {
    let buffer = AcquisitionBuffer::new(BufferMode::Accumulate { zeros_at_start: 0 }, 2, 250.0)
        .unwrap();
    for block in 0..10 {
        buffer.ingest(&sample_chunk(block * 50, 50)).unwrap();
    }
    buffer.set_annotations(vec![Annotation::new(300, "a"), Annotation::new(480, "b")]);

    // last two seconds of 500 samples start at sample 0
    let all = buffer.snapshot(Window::Seconds(2.0), None).unwrap();
    assert_eq!(all.samples(), 500);
    assert_eq!(all.annotations[0].onset_samples, 300);

    let recent = buffer.snapshot(Window::Seconds(0.4), None).unwrap();
    assert_eq!(recent.samples(), 100);
    assert_eq!(recent.first_sample, 400);
    assert_eq!(recent.annotations[0].onset_samples, -100);
    assert_eq!(recent.annotations[1].onset_samples, 80);
    assert!((recent.annotations[1].onset_seconds - 0.32).abs() < 1e-12);
    assert!((recent.duration_seconds() - 0.4).abs() < 1e-12);
}

#[test]
fn test_zero_length_window() {
    let buffer = AcquisitionBuffer::new(BufferMode::Roll { width: 10 }, 2, 100.0).unwrap();
    buffer.ingest(&sample_chunk(0, 5)).unwrap();
    let recording = buffer.snapshot(Window::Seconds(0.0), None).unwrap();
    assert_eq!(recording.samples(), 0);
    assert_eq!(recording.channels(), 2);
}

#[test]
fn test_roll_keeps_most_recent_samples() {
    let buffer = AcquisitionBuffer::new(BufferMode::Roll { width: 8 }, 2, 1.0).unwrap();
    buffer.ingest(&sample_chunk(0, 5)).unwrap();
    buffer.ingest(&sample_chunk(5, 6)).unwrap();

    let recording = buffer.snapshot(Window::All, None).unwrap();
    let counts: Vec<f64> = recording.data.row(1).to_vec();
    assert_eq!(counts, (3..11).map(|v| v as f64).collect::<Vec<_>>());
    assert_eq!(recording.first_sample, 3);
    assert_eq!(buffer.total_samples(), 11);
}

#[test]
fn test_roll_starts_zero_filled() {
    let buffer = AcquisitionBuffer::new(BufferMode::Roll { width: 6 }, 2, 1.0).unwrap();
    buffer.ingest(&sample_chunk(1, 2)).unwrap();
    buffer.add_annotation(Annotation::new(1, "first"));

    let recording = buffer.snapshot(Window::All, None).unwrap();
    assert_eq!(recording.data.row(1).to_vec(), vec![0.0, 0.0, 0.0, 0.0, 1.0, 2.0]);
    assert_eq!(recording.first_sample, -4);
    assert_eq!(recording.annotations[0].onset_samples, 5);
}

#[test]
fn test_wrong_channel_count_rejected() {
    let buffer = AcquisitionBuffer::new(BufferMode::Roll { width: 6 }, 3, 1.0).unwrap();
    assert_eq!(
        buffer.ingest(&sample_chunk(0, 2)),
        Err(BufferError::ShapeMismatch { expected: 3, actual: 2 })
    );
}

#[test]
fn test_snapshots_never_see_partial_chunks() {
    const BLOCK: usize = 7;
    let buffer = Arc::new(
        AcquisitionBuffer::new(BufferMode::Accumulate { zeros_at_start: 0 }, 2, 100.0).unwrap(),
    );
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let buffer = Arc::clone(&buffer);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for block in 0..300 {
                let value = block as f64;
                let data = Array2::from_elem((2, BLOCK), value);
                buffer.ingest_array(data.view()).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut observed = 0;
    while !done.load(Ordering::SeqCst) || observed == 0 {
        match buffer.snapshot(Window::All, None) {
            Ok(recording) => {
                assert_eq!(recording.samples() % BLOCK, 0);
                assert_eq!(recording.data.row(0), recording.data.row(1));
                observed += 1;
            }
            Err(BufferError::Empty) => {}
            Err(err) => panic!("unexpected snapshot error: {err}"),
        }
    }
    writer.join().unwrap();
    assert_eq!(buffer.total_samples(), 300 * BLOCK as u64);
}

fn controller_config() -> AcquisitionConfig {
    let mut config = AcquisitionConfig::default();
    config.buffer.mode = BufferModeConfig::Roll;
    config.buffer.roll_width_samples = 100;
    config.channels.bias_electrodes = vec![0, 1];
    config.connection.attempts = 2;
    config.connection.connect_timeout_ms = 500;
    config.connection.retry_delay_ms = 10;
    config.connection.operation_timeout_ms = 2000;
    config
}

#[tokio::test]
async fn test_controller_streams_in_configured_order() {
    let driver = Arc::new(SimulatedDriver::new(SimulatorConfig::default()).unwrap());
    let mut acquisition = Acquisition::new(driver.clone(), controller_config()).unwrap();
    acquisition.setup().await.unwrap();
    acquisition.start().await.unwrap();
    let handle = acquisition.session().handle();

    driver.emit_chunk(handle, 60);
    driver.sync();
    acquisition.annotate("marker");
    driver.emit_chunk(handle, 60);
    driver.sync();

    let recording = acquisition.snapshot(Window::Samples(100)).unwrap();
    let labels = acquisition.channel_labels();
    assert_eq!(recording.channels(), labels.len());
    assert_eq!(labels.first().map(String::as_str), Some("F3"));
    assert_eq!(labels.last().map(String::as_str), Some("Sample"));

    // last row is the sample counter, the one before it the digital input
    let sample_row = recording.data.row(labels.len() - 1);
    assert_eq!(sample_row[0], 20.0);
    assert_eq!(sample_row[99], 119.0);
    assert!(recording.data.row(labels.len() - 2).iter().all(|&v| v == 0.0));

    assert_eq!(recording.first_sample, 20);
    assert_eq!(recording.annotations.len(), 1);
    assert_eq!(recording.annotations[0].onset_samples, 40);
    assert_eq!(recording.annotations[0].text, "marker");

    assert_eq!(acquisition.battery_level().await.unwrap(), 87);
    acquisition.stop().await.unwrap();
}

#[tokio::test]
async fn test_impedance_measurement_drives_electrodes() {
    let driver = Arc::new(SimulatedDriver::new(SimulatorConfig::default()).unwrap());
    let mut acquisition = Acquisition::new(driver.clone(), controller_config()).unwrap();
    acquisition.setup().await.unwrap();
    acquisition.start_impedance_measurement().await.unwrap();

    driver.emit_chunk(acquisition.session().handle(), 100);
    driver.sync();
    let recording = acquisition.snapshot(Window::All).unwrap();
    let electrodes = acquisition.config().channels.cap.len();
    for row in 0..electrodes {
        assert!(recording.data.row(row).iter().all(|&v| v > 25.0));
    }

    acquisition.stop_impedance_measurement().await.unwrap();
    assert!(!acquisition.session().is_streaming());
}

#[tokio::test]
async fn test_controller_survives_restart() {
    let driver = Arc::new(SimulatedDriver::new(SimulatorConfig::default()).unwrap());
    let mut acquisition = Acquisition::new(driver.clone(), controller_config()).unwrap();
    acquisition.setup().await.unwrap();

    acquisition.start().await.unwrap();
    acquisition.stop().await.unwrap();
    acquisition.start().await.unwrap();
    driver.emit_chunk(acquisition.session().handle(), 10);
    driver.sync();
    assert_eq!(acquisition.buffer().unwrap().total_samples(), 10);
    acquisition.stop().await.unwrap();
}
