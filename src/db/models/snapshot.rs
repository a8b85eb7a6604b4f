//! Snapshot rows: the latest value of every channel at one point in time.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::sensors::{join_components, parse_components, LocationReading, SensorState, SensorType};

/// One space-joined component string per channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelValues {
    pub accelerometer: String,
    pub orientation: String,
    pub gyroscope: String,
    pub magnetic_field: String,
    pub gravity: String,
    pub geomagnetic_rotation: String,
    pub rotation_vector: String,
    pub computed_orientation: String,
}

impl ChannelValues {
    pub fn capture(state: &SensorState) -> Self {
        let joined = |sensor| join_components(&state.latest(sensor));
        Self {
            accelerometer: joined(SensorType::Accelerometer),
            orientation: joined(SensorType::Orientation),
            gyroscope: joined(SensorType::Gyroscope),
            magnetic_field: joined(SensorType::MagneticField),
            gravity: joined(SensorType::Gravity),
            geomagnetic_rotation: joined(SensorType::GeomagneticRotation),
            rotation_vector: joined(SensorType::RotationVector),
            computed_orientation: joined(SensorType::ComputedOrientation),
        }
    }

    pub fn get(&self, sensor: SensorType) -> &str {
        match sensor {
            SensorType::Accelerometer => &self.accelerometer,
            SensorType::Orientation => &self.orientation,
            SensorType::Gyroscope => &self.gyroscope,
            SensorType::MagneticField => &self.magnetic_field,
            SensorType::Gravity => &self.gravity,
            SensorType::GeomagneticRotation => &self.geomagnetic_rotation,
            SensorType::RotationVector => &self.rotation_vector,
            SensorType::ComputedOrientation => &self.computed_orientation,
        }
    }

    pub fn vector(&self, sensor: SensorType) -> Result<Vec<f32>> {
        parse_components(self.get(sensor))
    }
}

/// A snapshot waiting to be appended; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSnapshot {
    pub time: String,
    pub channels: ChannelValues,
    pub location: Option<LocationReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: i64,
    pub time: String,
    pub channels: ChannelValues,
    pub location: Option<LocationReading>,
}
