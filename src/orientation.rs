//! Device orientation from accelerometer and magnetometer readings.
//!
//! The rotation matrix maps device coordinates onto the world frame where X points east,
//! Y points to magnetic north and Z points up. It is decomposed into azimuth (rotation
//! about -Z), pitch (about X) and roll (about Y), all in radians.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard gravity, m/s².
pub const STANDARD_GRAVITY: f32 = 9.80665;

/// Below this squared norm the device is treated as being in free fall.
const FREE_FALL_GRAVITY_SQUARED: f32 = 0.01 * STANDARD_GRAVITY * STANDARD_GRAVITY;

/// Minimum norm of the east vector; below it gravity and the field are parallel.
const MIN_EAST_NORM: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DegenerateInputError {
    #[error("acceleration norm² {norm_squared} is below the free-fall threshold")]
    FreeFall { norm_squared: f32 },
    #[error("acceleration is parallel to the magnetic field (east norm {east_norm})")]
    ParallelField { east_norm: f32 },
    #[error("non-finite sensor input")]
    NonFinite,
}

/// Azimuth in [0, 2π), pitch in [-π/2, π/2], roll in [-π, π].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub azimuth: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Orientation {
    pub fn to_array(self) -> [f32; 3] {
        [self.azimuth, self.pitch, self.roll]
    }
}

/// Row-major 3×3 rotation matrix.
pub type RotationMatrix = [f32; 9];

/// Builds the device-to-world rotation matrix from gravity and the geomagnetic field.
pub fn rotation_matrix(
    gravity: [f32; 3],
    geomagnetic: [f32; 3],
) -> Result<RotationMatrix, DegenerateInputError> {
    if gravity.iter().chain(geomagnetic.iter()).any(|v| !v.is_finite()) {
        return Err(DegenerateInputError::NonFinite);
    }

    let [mut ax, mut ay, mut az] = gravity;
    let [ex, ey, ez] = geomagnetic;

    let norm_squared = ax * ax + ay * ay + az * az;
    if norm_squared < FREE_FALL_GRAVITY_SQUARED {
        return Err(DegenerateInputError::FreeFall { norm_squared });
    }

    // East = field × gravity
    let mut hx = ey * az - ez * ay;
    let mut hy = ez * ax - ex * az;
    let mut hz = ex * ay - ey * ax;
    let east_norm = (hx * hx + hy * hy + hz * hz).sqrt();
    if east_norm < MIN_EAST_NORM {
        return Err(DegenerateInputError::ParallelField { east_norm });
    }

    let inv_h = 1.0 / east_norm;
    hx *= inv_h;
    hy *= inv_h;
    hz *= inv_h;

    let inv_a = 1.0 / norm_squared.sqrt();
    ax *= inv_a;
    ay *= inv_a;
    az *= inv_a;

    // North = gravity × east
    let mx = ay * hz - az * hy;
    let my = az * hx - ax * hz;
    let mz = ax * hy - ay * hx;

    Ok([hx, hy, hz, mx, my, mz, ax, ay, az])
}

/// Decomposes a rotation matrix into azimuth, pitch and roll.
pub fn orientation_from_matrix(r: &RotationMatrix) -> Orientation {
    let azimuth = r[1].atan2(r[4]);
    let pitch = (-r[7]).clamp(-1.0, 1.0).asin();
    let roll = (-r[6]).atan2(r[8]);

    Orientation {
        azimuth: normalize_azimuth(azimuth),
        pitch,
        roll,
    }
}

pub fn estimate_orientation(
    magnetic_field: [f32; 3],
    acceleration: [f32; 3],
) -> Result<Orientation, DegenerateInputError> {
    rotation_matrix(acceleration, magnetic_field).map(|r| orientation_from_matrix(&r))
}

fn normalize_azimuth(angle: f32) -> f32 {
    let wrapped = if angle < 0.0 { angle + TAU } else { angle };
    // -ε + 2π can round up to exactly 2π in f32.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}
