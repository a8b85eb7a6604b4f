use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One named source of a fixed-size vector reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    /// Acceleration along X/Y/Z, m/s².
    Accelerometer,
    /// Legacy platform orientation (azimuth, pitch, roll), degrees.
    Orientation,
    /// Rate of rotation around X/Y/Z, rad/s.
    Gyroscope,
    /// Ambient magnetic field along X/Y/Z, μT.
    MagneticField,
    /// Gravity along X/Y/Z, m/s².
    Gravity,
    GeomagneticRotation,
    /// Rotation quaternion: x, y, z and the scalar component.
    RotationVector,
    /// Azimuth, pitch and roll derived from the accelerometer and magnetometer, radians.
    ComputedOrientation,
}

impl SensorType {
    pub const ALL: [SensorType; 8] = [
        SensorType::Accelerometer,
        SensorType::Orientation,
        SensorType::Gyroscope,
        SensorType::MagneticField,
        SensorType::Gravity,
        SensorType::GeomagneticRotation,
        SensorType::RotationVector,
        SensorType::ComputedOrientation,
    ];

    /// Channels delivered by a sensor source; the computed orientation is derived locally.
    pub const PHYSICAL: [SensorType; 7] = [
        SensorType::Accelerometer,
        SensorType::Orientation,
        SensorType::Gyroscope,
        SensorType::MagneticField,
        SensorType::Gravity,
        SensorType::GeomagneticRotation,
        SensorType::RotationVector,
    ];

    pub fn dims(self) -> usize {
        match self {
            SensorType::RotationVector => 4,
            _ => 3,
        }
    }

    pub fn is_physical(self) -> bool {
        self != SensorType::ComputedOrientation
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SensorType::Accelerometer => "accelerometer",
            SensorType::Orientation => "orientation",
            SensorType::Gyroscope => "gyroscope",
            SensorType::MagneticField => "magnetic_field",
            SensorType::Gravity => "gravity",
            SensorType::GeomagneticRotation => "geomagnetic_rotation",
            SensorType::RotationVector => "rotation_vector",
            SensorType::ComputedOrientation => "computed_orientation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SensorType::Accelerometer => "Accelerometer",
            SensorType::Orientation => "Orientation (legacy)",
            SensorType::Gyroscope => "Gyroscope",
            SensorType::MagneticField => "Magnetometer",
            SensorType::Gravity => "Gravity",
            SensorType::GeomagneticRotation => "Geomagnetic rotation",
            SensorType::RotationVector => "Rotation vector",
            SensorType::ComputedOrientation => "Orientation (computed)",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SensorType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == value)
            .ok_or_else(|| anyhow::anyhow!("unknown sensor type '{value}'"))
    }
}

/// Space-joined components, e.g. `0 9.8 0`.
pub fn join_components(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn parse_components(value: &str) -> anyhow::Result<Vec<f32>> {
    value
        .split_whitespace()
        .map(|part| {
            part.parse::<f32>()
                .map_err(|err| anyhow::anyhow!("invalid component '{part}': {err}"))
        })
        .collect()
}
