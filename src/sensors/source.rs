use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{SensorType, SourceEvent};

/// Rates handed to a source on registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingRequest {
    pub sampling_period: Duration,
    pub max_report_latency: Duration,
    /// `None` when location updates are not wanted (or not permitted).
    pub location_interval: Option<Duration>,
}

impl Default for SamplingRequest {
    fn default() -> Self {
        Self {
            sampling_period: Duration::from_millis(500),
            max_report_latency: Duration::from_millis(500),
            location_interval: Some(Duration::from_millis(500)),
        }
    }
}

/// Producer of sensor readings and location fixes.
pub trait SensorSource: Send + Sync {
    /// Channels the device can deliver.
    fn available_channels(&self) -> Vec<SensorType>;

    /// Starts pushing events for `channels` into `sink` until the returned
    /// registration is dropped or unregistered.
    fn register(
        &self,
        channels: &[SensorType],
        request: SamplingRequest,
        sink: mpsc::UnboundedSender<SourceEvent>,
    ) -> Result<Registration>;
}

/// Unsubscribe handle returned by [`SensorSource::register`].
pub struct Registration {
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Registration {
    pub fn new(cancel_token: CancellationToken, handle: Option<JoinHandle<()>>) -> Self {
        Self {
            cancel_token,
            handle,
        }
    }

    pub async fn unregister(mut self) -> Result<()> {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.await.context("sensor source task failed to join")?;
        }
        Ok(())
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
