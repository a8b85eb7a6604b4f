use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Registration, SamplingRequest, SensorSampler, SensorSource, SensorType, SourceEvent};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Owns the source registration and the single task that applies its events.
pub struct SamplerController {
    sampler: SensorSampler,
    request: SamplingRequest,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    registration: Option<Registration>,
    source_closed: CancellationToken,
}

impl SamplerController {
    pub fn new(sampler: SensorSampler, request: SamplingRequest) -> Self {
        Self {
            sampler,
            request,
            handle: None,
            cancel_token: None,
            registration: None,
            source_closed: CancellationToken::new(),
        }
    }

    pub fn sampler(&self) -> &SensorSampler {
        &self.sampler
    }

    pub fn is_registered(&self) -> bool {
        self.handle.is_some()
    }

    /// Cancelled once the current source stops producing events on its own.
    pub fn source_closed(&self) -> CancellationToken {
        self.source_closed.clone()
    }

    /// Registers every available physical channel and starts applying events.
    /// Returns the channels that were registered.
    pub fn register(&mut self, source: &dyn SensorSource) -> Result<Vec<SensorType>> {
        if self.handle.is_some() {
            bail!("sensor sampling already active");
        }

        let available = source.available_channels();
        log_info!("Available sensors: {:?}", available);

        let channels: Vec<SensorType> = SensorType::PHYSICAL
            .into_iter()
            .filter(|ty| available.contains(ty))
            .collect();
        if channels.is_empty() {
            log_warn!("source offers none of the sampled channels");
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let registration = source
            .register(&channels, self.request, event_tx)
            .context("failed to register sensor listener")?;

        let cancel_token = CancellationToken::new();
        self.source_closed = CancellationToken::new();
        let handle = tokio::spawn(sampling_loop(
            event_rx,
            self.sampler.clone(),
            cancel_token.clone(),
            self.source_closed.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.registration = Some(registration);

        log_info!("Registered {} sensor channels", channels.len());
        Ok(channels)
    }

    /// Deregisters the source. Channel values are left as they were.
    pub async fn unregister(&mut self) -> Result<()> {
        if let Some(registration) = self.registration.take() {
            registration.unregister().await?;
        }

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sampling loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

async fn sampling_loop(
    mut events: mpsc::UnboundedReceiver<SourceEvent>,
    sampler: SensorSampler,
    cancel_token: CancellationToken,
    source_closed: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("sampling loop shutting down");
                break;
            }
            event = events.recv() => {
                match event {
                    Some(event) => sampler.apply(event),
                    None => {
                        log_info!("sensor source closed");
                        source_closed.cancel();
                        break;
                    }
                }
            }
        }
    }
}
