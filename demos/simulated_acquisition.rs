//! Stream from the simulated driver for a few seconds and print snapshot stats
//!
//! Run with `cargo run --example simulated_acquisition [config.toml]`.

use eeg_core::acquisition::{Acquisition, Window};
use eeg_core::config::ConfigLoader;
use eeg_core::hal::simulator::{SimulatedDriver, SimulatorConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let loader = match std::env::args().nth(1) {
        Some(path) => ConfigLoader::with_paths(vec![PathBuf::from(path)]),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;

    let simulator = config.simulator.clone().unwrap_or(SimulatorConfig {
        auto_stream_interval_ms: Some(100),
        ..Default::default()
    });
    let driver = Arc::new(SimulatedDriver::new(simulator)?);

    let mut acquisition = Acquisition::new(driver, config)?;
    acquisition.setup().await?;

    let info = acquisition.session().get_device_info();
    println!(
        "connected to {:?} #{} (firmware {})",
        info.model, info.serial_number, info.firmware_version
    );
    println!("battery: {}%", acquisition.battery_level().await?);

    acquisition.start().await?;
    for second in 1..=3 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        acquisition.annotate(&format!("second {}", second));
    }

    let recording = acquisition.snapshot(Window::Seconds(2.0))?;
    acquisition.stop().await?;

    println!(
        "{} channels x {} samples ({:.2} s)",
        recording.channels(),
        recording.samples(),
        recording.duration_seconds()
    );
    for (label, row) in acquisition.channel_labels().iter().zip(recording.data.rows()) {
        let mean = row.mean().unwrap_or(0.0);
        println!("{:>8}: mean {:>9.3}", label, mean);
    }
    for annotation in &recording.annotations {
        println!(
            "annotation {:?} at {:+.3} s",
            annotation.text, annotation.onset_seconds
        );
    }
    Ok(())
}
