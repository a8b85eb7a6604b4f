//! Latest value per channel, shared between the sampler, the recorder and any viewers.
//!
//! Every holder is a `watch` channel whose value is replaced wholesale, so readers always
//! observe a complete vector.

use std::sync::Arc;

use tokio::sync::watch;

use super::{LocationReading, SensorType};

struct Holders {
    channels: Vec<watch::Sender<Vec<f32>>>,
    location: watch::Sender<Option<LocationReading>>,
    location_available: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct SensorState {
    inner: Arc<Holders>,
}

impl Default for SensorState {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorState {
    pub fn new() -> Self {
        let channels = SensorType::ALL
            .into_iter()
            .map(|ty| watch::channel(vec![0.0; ty.dims()]).0)
            .collect();

        Self {
            inner: Arc::new(Holders {
                channels,
                location: watch::channel(None).0,
                location_available: watch::channel(false).0,
            }),
        }
    }

    pub fn latest(&self, sensor: SensorType) -> Vec<f32> {
        self.holder(sensor).borrow().clone()
    }

    pub fn latest_location(&self) -> Option<LocationReading> {
        *self.inner.location.borrow()
    }

    pub fn location_available(&self) -> bool {
        *self.inner.location_available.borrow()
    }

    pub fn subscribe(&self, sensor: SensorType) -> watch::Receiver<Vec<f32>> {
        self.holder(sensor).subscribe()
    }

    pub fn subscribe_location(&self) -> watch::Receiver<Option<LocationReading>> {
        self.inner.location.subscribe()
    }

    /// Replaces the channel's vector, resized to the channel width.
    pub(crate) fn replace(&self, sensor: SensorType, values: &[f32]) {
        let mut vector = vec![0.0; sensor.dims()];
        for (slot, value) in vector.iter_mut().zip(values) {
            *slot = *value;
        }
        self.holder(sensor).send_replace(vector);
    }

    pub(crate) fn replace_location(&self, location: LocationReading) {
        self.inner.location.send_replace(Some(location));
    }

    pub(crate) fn set_location_available(&self, available: bool) {
        self.inner.location_available.send_replace(available);
    }

    fn holder(&self, sensor: SensorType) -> &watch::Sender<Vec<f32>> {
        &self.inner.channels[sensor.index()]
    }
}
