use serde::{Deserialize, Serialize};

use super::SensorType;

/// Platform-reported reliability of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SensorAccuracy {
    Unreliable,
    Low,
    Medium,
    #[default]
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
    pub sensor: SensorType,
    pub values: Vec<f32>,
    pub accuracy: SensorAccuracy,
}

impl SensorEvent {
    pub fn new(sensor: SensorType, values: impl Into<Vec<f32>>) -> Self {
        Self {
            sensor,
            values: values.into(),
            accuracy: SensorAccuracy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationReading {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above the WGS84 ellipsoid.
    pub altitude: f64,
    /// Horizontal accuracy radius, meters.
    pub accuracy: f32,
    /// Meters per second.
    pub speed: f32,
    pub speed_accuracy: f32,
    /// Degrees east of true north.
    pub bearing: f32,
    pub bearing_accuracy: f32,
}

/// Everything a source can push into the sampler.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Reading(SensorEvent),
    Location(LocationReading),
    LocationAvailability(bool),
}

impl From<SensorEvent> for SourceEvent {
    fn from(event: SensorEvent) -> Self {
        SourceEvent::Reading(event)
    }
}

impl From<LocationReading> for SourceEvent {
    fn from(location: LocationReading) -> Self {
        SourceEvent::Location(location)
    }
}
