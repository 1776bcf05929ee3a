// src/acquisition/controller.rs
//! Acquisition controller: one session feeding one buffer
//!
//! Configuration-driven convenience layer over [`Session`] and
//! [`AcquisitionBuffer`]. Everything it does can also be done by hand with
//! those two types.

use crate::acquisition::buffer_manager::{AcquisitionBuffer, Recording, Window};
use crate::config::{AcquisitionConfig, ConfigError};
use crate::error::{EegError, EegResult};
use crate::hal::channel;
use crate::hal::traits::Driver;
use crate::hal::types::{ImpedanceMode, NativeError, Polarity};
use crate::session::{Pending, Session};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connects a device, streams into an [`AcquisitionBuffer`] and hands out
/// snapshots with rows in configured channel order.
pub struct Acquisition {
    session: Session,
    config: AcquisitionConfig,
    buffer: Option<Arc<AcquisitionBuffer>>,
    /// Chunk row of each recorded channel, in configured order
    channel_rows: Vec<usize>,
}

impl Acquisition {
    /// Open a session on `driver`. Nothing is sent to the device yet.
    pub fn new(driver: Arc<dyn Driver>, config: AcquisitionConfig) -> EegResult<Self> {
        config.validate().map_err(ConfigError::Validation)?;
        Ok(Self {
            session: Session::new(driver)?,
            config,
            buffer: None,
            channel_rows: Vec::new(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// The buffer created by [`Acquisition::setup`]
    pub fn buffer(&self) -> Option<&Arc<AcquisitionBuffer>> {
        self.buffer.as_ref()
    }

    /// Labels of the snapshot rows
    pub fn channel_labels(&self) -> Vec<String> {
        self.config
            .channels
            .recorded_channels()
            .into_iter()
            .map(|(_, label)| label)
            .collect()
    }

    /// Connect with bounded retries and allocate the buffer.
    ///
    /// Each attempt waits at most `connect_timeout`; a timed out attempt is
    /// abandoned with a disconnect before the next one starts.
    pub async fn setup(&mut self) -> EegResult<()> {
        let settings = self.config.connection.clone();

        let mut connected = false;
        for attempt in 1..=settings.attempts {
            match self.connect_once(&settings.address, settings.connect_timeout()).await {
                Ok(()) => {
                    connected = true;
                    break;
                }
                Err(err) => {
                    warn!(attempt, attempts = settings.attempts, %err, "connection attempt failed");
                }
            }
            if attempt < settings.attempts {
                tokio::time::sleep(settings.retry_delay()).await;
            }
        }
        if !connected {
            return Err(EegError::ConnectFailed {
                address: settings.address,
                attempts: settings.attempts,
            });
        }

        let sample_rate = f64::from(self.session.get_sample_frequency());
        let channels = self.config.channels.recorded_channels().len();
        let buffer = AcquisitionBuffer::new(self.config.buffer.buffer_mode(), channels, sample_rate)?;
        self.buffer = Some(Arc::new(buffer));

        info!(
            handle = %self.session.handle(),
            address = %settings.address,
            sample_rate,
            channels,
            "acquisition set up"
        );
        Ok(())
    }

    async fn connect_once(&self, address: &str, timeout: Duration) -> EegResult<()> {
        let pending = self.session.connect(address)?;
        match tokio::time::timeout(timeout, pending).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(NativeError::Connection.into()),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => {
                // abandon the attempt so the next connect is accepted
                self.session.disconnect();
                Err(EegError::Timeout { operation: "connect" })
            }
        }
    }

    /// Configure the recorded channels and start streaming into the buffer
    pub async fn start(&mut self) -> EegResult<()> {
        let buffer = Arc::clone(self.buffer.as_ref().ok_or(EegError::NotSetUp)?);
        let recorded = self.config.channels.recorded_channels();

        for (id, _) in &recorded {
            self.session.set_channel_enabled(*id, true);
        }
        for &bias in &self.config.channels.bias_electrodes {
            self.session
                .set_channel_bias(channel::electrode(bias), Polarity::Both);
        }
        let gain = self.config.channels.gain_mode();
        for electrode in &self.config.channels.cap {
            self.session
                .set_channel_gain(channel::electrode(electrode.electrode), gain);
        }

        self.session.set_chunk_sink(Some(Box::new(move |chunk| {
            if let Err(err) = buffer.ingest(&chunk) {
                warn!(%err, samples = chunk.samples(), "chunk not buffered");
            }
        })));

        let pending = self.session.start_stream()?;
        self.await_operation("start_stream", pending).await?;

        self.channel_rows = recorded
            .iter()
            .map(|(id, _)| self.session.get_channel_index(*id))
            .collect::<Result<_, _>>()?;
        debug!(rows = ?self.channel_rows, "resolved chunk rows");
        info!(handle = %self.session.handle(), ?gain, "acquisition started");
        Ok(())
    }

    pub async fn stop(&mut self) -> EegResult<()> {
        let pending = self.session.stop_stream()?;
        let result = self.await_operation("stop_stream", pending).await;
        self.session.set_chunk_sink(None);
        result?;
        info!(handle = %self.session.handle(), "acquisition stopped");
        Ok(())
    }

    /// Mark the current sample with `text`
    pub fn annotate(&self, text: &str) {
        self.session.annotate(text);
    }

    /// Copy out `window` with rows in configured channel order and
    /// annotations re-based to the first returned sample
    pub fn snapshot(&self, window: Window) -> EegResult<Recording> {
        let buffer = self.buffer.as_ref().ok_or(EegError::NotSetUp)?;
        buffer.set_annotations(self.session.get_annotations());

        let order = (!self.channel_rows.is_empty()).then_some(self.channel_rows.as_slice());
        Ok(buffer.snapshot(window, order)?)
    }

    /// Battery level in percent
    pub async fn battery_level(&self) -> EegResult<u8> {
        let pending = self.session.get_full_battery_info()?;
        let info = self.await_operation("get_full_battery_info", pending).await?;
        Ok(info.level)
    }

    /// Switch the electrodes to impedance drive and start streaming
    pub async fn start_impedance_measurement(&mut self) -> EegResult<()> {
        self.session.set_impedance_mode(ImpedanceMode::Hz31_2);
        self.start().await
    }

    pub async fn stop_impedance_measurement(&mut self) -> EegResult<()> {
        let result = self.stop().await;
        self.session.set_impedance_mode(ImpedanceMode::Off);
        result
    }

    async fn await_operation<T>(&self, operation: &'static str, pending: Pending<T>) -> EegResult<T> {
        match tokio::time::timeout(self.config.connection.operation_timeout(), pending).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(EegError::Timeout { operation }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::simulator::{SimulatedDriver, SimulatorConfig};

    fn fast_config() -> AcquisitionConfig {
        let mut config = AcquisitionConfig::default();
        config.connection.attempts = 2;
        config.connection.connect_timeout_ms = 200;
        config.connection.retry_delay_ms = 10;
        config.connection.operation_timeout_ms = 1000;
        config
    }

    #[tokio::test]
    async fn test_setup_allocates_buffer() {
        let driver = Arc::new(SimulatedDriver::new(SimulatorConfig::default()).unwrap());
        let mut acquisition = Acquisition::new(driver, fast_config()).unwrap();
        assert!(acquisition.buffer().is_none());

        acquisition.setup().await.unwrap();
        let buffer = acquisition.buffer().unwrap();
        assert_eq!(buffer.channels(), 8 + 3 + 1 + 1);
        assert_eq!(buffer.sample_rate(), 250.0);
    }

    #[tokio::test]
    async fn test_setup_gives_up_after_attempts() {
        let sim = SimulatorConfig {
            connect_succeeds: false,
            ..Default::default()
        };
        let driver = Arc::new(SimulatedDriver::new(sim).unwrap());
        let mut acquisition = Acquisition::new(driver, fast_config()).unwrap();

        match acquisition.setup().await {
            Err(EegError::ConnectFailed { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected ConnectFailed, got {:?}", other),
        }
        assert!(acquisition.buffer().is_none());
    }

    #[tokio::test]
    async fn test_start_requires_setup() {
        let driver = Arc::new(SimulatedDriver::new(SimulatorConfig::default()).unwrap());
        let mut acquisition = Acquisition::new(driver, fast_config()).unwrap();
        assert!(matches!(acquisition.start().await, Err(EegError::NotSetUp)));
        assert!(matches!(acquisition.snapshot(Window::All), Err(EegError::NotSetUp)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let driver = Arc::new(SimulatedDriver::new(SimulatorConfig::default()).unwrap());
        let mut config = AcquisitionConfig::default();
        config.channels.cap.clear();
        assert!(matches!(
            Acquisition::new(driver, config),
            Err(EegError::Config(_))
        ));
    }
}
