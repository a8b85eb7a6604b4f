use anyhow::anyhow;
use rusqlite::Row;

use crate::db::models::ChannelValues;
use crate::sensors::LocationReading;

/// Wraps a decoding failure so it can travel through `query_map`.
pub fn invalid_data(err: impl std::fmt::Display) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            err.to_string(),
        )),
    )
}

/// Reads the eight channel columns starting at `start`.
pub fn channels_from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<ChannelValues> {
    Ok(ChannelValues {
        accelerometer: row.get(start)?,
        orientation: row.get(start + 1)?,
        gyroscope: row.get(start + 2)?,
        magnetic_field: row.get(start + 3)?,
        gravity: row.get(start + 4)?,
        geomagnetic_rotation: row.get(start + 5)?,
        rotation_vector: row.get(start + 6)?,
        computed_orientation: row.get(start + 7)?,
    })
}

/// Reads the eight location columns starting at `start`.
///
/// All NULL means the record was taken before the first fix; a partial row is corrupt.
pub fn location_from_row(
    row: &Row<'_>,
    start: usize,
) -> rusqlite::Result<Option<LocationReading>> {
    let latitude: Option<f64> = row.get(start)?;
    let longitude: Option<f64> = row.get(start + 1)?;
    let altitude: Option<f64> = row.get(start + 2)?;
    let accuracy: Option<f32> = row.get(start + 3)?;
    let speed: Option<f32> = row.get(start + 4)?;
    let speed_accuracy: Option<f32> = row.get(start + 5)?;
    let bearing: Option<f32> = row.get(start + 6)?;
    let bearing_accuracy: Option<f32> = row.get(start + 7)?;

    match (
        latitude,
        longitude,
        altitude,
        accuracy,
        speed,
        speed_accuracy,
        bearing,
        bearing_accuracy,
    ) {
        (
            Some(latitude),
            Some(longitude),
            Some(altitude),
            Some(accuracy),
            Some(speed),
            Some(speed_accuracy),
            Some(bearing),
            Some(bearing_accuracy),
        ) => Ok(Some(LocationReading {
            latitude,
            longitude,
            altitude,
            accuracy,
            speed,
            speed_accuracy,
            bearing,
            bearing_accuracy,
        })),
        (None, None, None, None, None, None, None, None) => Ok(None),
        _ => Err(invalid_data(anyhow!("partially populated location columns"))),
    }
}
