use log::trace;

use crate::orientation::{estimate_orientation, DegenerateInputError, Orientation};

use super::{join_components, SensorEvent, SensorState, SensorType, SourceEvent};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Copies source events into the shared holders and keeps the computed orientation current.
#[derive(Clone)]
pub struct SensorSampler {
    state: SensorState,
}

impl SensorSampler {
    pub fn new(state: SensorState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &SensorState {
        &self.state
    }

    pub fn apply(&self, event: SourceEvent) {
        match event {
            SourceEvent::Reading(reading) => self.apply_reading(reading),
            SourceEvent::Location(location) => {
                log_debug!(
                    "location: {} -- {}",
                    location.latitude,
                    location.longitude
                );
                self.state.replace_location(location);
            }
            SourceEvent::LocationAvailability(available) => {
                log_info!("location availability: {available}");
                self.state.set_location_available(available);
            }
        }
    }

    fn apply_reading(&self, event: SensorEvent) {
        if !event.sensor.is_physical() {
            log_warn!("ignoring {} event from source; channel is derived", event.sensor);
            return;
        }

        self.state.replace(event.sensor, &event.values);
        log_debug!(
            "{}: {} ({:?})",
            event.sensor,
            join_components(&event.values),
            event.accuracy
        );

        // A degenerate pair leaves the last good estimate in place.
        let _ = self.refresh_orientation();
    }

    /// Recomputes the derived orientation channel from the latest accelerometer and
    /// magnetometer vectors.
    pub fn refresh_orientation(&self) -> Result<Orientation, DegenerateInputError> {
        let acceleration = vec3(&self.state.latest(SensorType::Accelerometer));
        let magnetic_field = vec3(&self.state.latest(SensorType::MagneticField));

        match estimate_orientation(magnetic_field, acceleration) {
            Ok(orientation) => {
                self.state
                    .replace(SensorType::ComputedOrientation, &orientation.to_array());
                Ok(orientation)
            }
            Err(err) => {
                trace!("orientation not updated: {err}");
                Err(err)
            }
        }
    }
}

fn vec3(values: &[f32]) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = *value;
    }
    out
}
