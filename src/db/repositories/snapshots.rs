use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use crate::db::{
    connection::Database,
    helpers::{channels_from_row, location_from_row},
    models::{NewSnapshot, SnapshotRecord},
};
use crate::recorder::SnapshotStore;

const SELECT_COLUMNS: &str = "SELECT
        id,
        time,
        accelerometer,
        orientation,
        gyroscope,
        magnetic_field,
        gravity,
        geomagnetic_rotation,
        rotation_vector,
        computed_orientation,
        latitude,
        longitude,
        altitude,
        gps_accuracy,
        gps_speed,
        gps_speed_accuracy,
        gps_bearing,
        gps_bearing_accuracy
    FROM sensors_data";

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SnapshotRecord> {
    Ok(SnapshotRecord {
        id: row.get(0)?,
        time: row.get(1)?,
        channels: channels_from_row(row, 2)?,
        location: location_from_row(row, 10)?,
    })
}

impl Database {
    /// Appends one snapshot and returns its id.
    pub async fn insert_snapshot(&self, snapshot: &NewSnapshot) -> Result<i64> {
        let record = snapshot.clone();
        self.execute(move |conn| {
            let channels = &record.channels;
            let location = record.location.as_ref();

            conn.execute(
                "INSERT INTO sensors_data (
                    time,
                    accelerometer,
                    orientation,
                    gyroscope,
                    magnetic_field,
                    gravity,
                    geomagnetic_rotation,
                    rotation_vector,
                    computed_orientation,
                    latitude,
                    longitude,
                    altitude,
                    gps_accuracy,
                    gps_speed,
                    gps_speed_accuracy,
                    gps_bearing,
                    gps_bearing_accuracy
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    record.time,
                    channels.accelerometer,
                    channels.orientation,
                    channels.gyroscope,
                    channels.magnetic_field,
                    channels.gravity,
                    channels.geomagnetic_rotation,
                    channels.rotation_vector,
                    channels.computed_orientation,
                    location.map(|l| l.latitude),
                    location.map(|l| l.longitude),
                    location.map(|l| l.altitude),
                    location.map(|l| l.accuracy),
                    location.map(|l| l.speed),
                    location.map(|l| l.speed_accuracy),
                    location.map(|l| l.bearing),
                    location.map(|l| l.bearing_accuracy),
                ],
            )
            .with_context(|| "failed to insert snapshot")?;

            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn count_snapshots(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM sensors_data", [], |row| row.get(0))
                .context("failed to count snapshots")?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    /// Snapshots in insertion order, optionally only the first `limit`.
    pub async fn list_snapshots(&self, limit: Option<u64>) -> Result<Vec<SnapshotRecord>> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX)).unwrap_or(-1);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC LIMIT ?1"))?;
            let rows = stmt.query_map(params![limit], record_from_row)?;

            let mut records = Vec::new();
            for record in rows {
                records.push(record?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn latest_snapshot(&self) -> Result<Option<SnapshotRecord>> {
        self.execute(|conn| {
            let record = conn
                .query_row(
                    &format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT 1"),
                    [],
                    record_from_row,
                )
                .optional()
                .context("failed to load latest snapshot")?;
            Ok(record)
        })
        .await
    }
}

impl SnapshotStore for Database {
    async fn append(&self, snapshot: NewSnapshot) -> Result<i64> {
        self.insert_snapshot(&snapshot).await
    }
}
