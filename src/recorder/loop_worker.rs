use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::db::{ChannelValues, NewSnapshot};
use crate::sensors::SensorState;
use crate::settings::{LocationPolicy, RecorderSettings};

use super::stats::StatsCounters;
use super::SnapshotStore;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Sortable, human-readable record time, e.g. `2024-05-01 10:00:00.500`.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Written(i64),
    /// No location fix yet and the policy asks to skip.
    Skipped,
}

pub fn format_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp.format(TIME_FORMAT).to_string()
}

/// Reads every channel and the location into a row, or `None` when the tick should be skipped.
pub fn capture_snapshot(
    sensors: &SensorState,
    time: String,
    policy: LocationPolicy,
) -> Option<NewSnapshot> {
    let location = sensors.latest_location();
    if location.is_none() && policy == LocationPolicy::SkipRecord {
        return None;
    }

    Some(NewSnapshot {
        time,
        channels: ChannelValues::capture(sensors),
        location,
    })
}

pub(crate) async fn recording_loop<S: SnapshotStore>(
    sensors: SensorState,
    store: S,
    settings: RecorderSettings,
    cancel_token: CancellationToken,
    counters: Arc<StatsCounters>,
) {
    let mut ticker = tokio::time::interval(settings.saving_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_timestamp: Option<DateTime<Local>> = None;

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("recording loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                counters.tick();
                let timestamp = next_timestamp(&mut last_timestamp);

                match perform_tick(&sensors, &store, settings.location_policy, timestamp).await {
                    Ok(TickOutcome::Written(id)) => {
                        counters.written();
                        log_debug!("snapshot {id} written");
                    }
                    Ok(TickOutcome::Skipped) => {
                        counters.skipped();
                        log_debug!("snapshot skipped: no location fix yet");
                    }
                    Err(err) => {
                        counters.failed();
                        log_error!("snapshot write failed: {err:?}");
                    }
                }
            }
        }
    }
}

pub(crate) async fn perform_tick<S: SnapshotStore>(
    sensors: &SensorState,
    store: &S,
    policy: LocationPolicy,
    timestamp: DateTime<Local>,
) -> Result<TickOutcome> {
    let Some(snapshot) = capture_snapshot(sensors, format_timestamp(&timestamp), policy) else {
        return Ok(TickOutcome::Skipped);
    };

    let id = store
        .append(snapshot)
        .await
        .context("failed to persist snapshot")?;
    Ok(TickOutcome::Written(id))
}

/// Wall-clock time, held at the previous value if the clock stepped backwards.
fn next_timestamp(last: &mut Option<DateTime<Local>>) -> DateTime<Local> {
    let now = Local::now();
    let timestamp = match *last {
        Some(previous) if previous > now => previous,
        _ => now,
    };
    *last = Some(timestamp);
    timestamp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::store::memory::MemoryStore;
    use crate::sensors::{LocationReading, SensorEvent, SensorSampler, SensorType};
    use chrono::TimeZone;

    fn fix() -> LocationReading {
        LocationReading {
            latitude: 59.93,
            longitude: 30.31,
            altitude: 12.0,
            accuracy: 5.0,
            speed: 0.0,
            speed_accuracy: 0.1,
            bearing: 0.0,
            bearing_accuracy: 180.0,
        }
    }

    #[tokio::test]
    async fn one_tick_serializes_every_injected_vector() {
        let sampler = SensorSampler::new(SensorState::new());
        let injected = [
            (SensorType::Accelerometer, vec![0.0, 9.8, 0.0]),
            (SensorType::Orientation, vec![12.5, -3.0, 1.5]),
            (SensorType::Gyroscope, vec![0.01, -0.02, 0.03]),
            (SensorType::MagneticField, vec![20.0, 0.0, -40.0]),
            (SensorType::Gravity, vec![0.0, 9.81, 0.0]),
            (SensorType::GeomagneticRotation, vec![0.1, 0.2, 0.3]),
            (SensorType::RotationVector, vec![0.5, 0.5, 0.5, 0.5]),
        ];
        for (sensor, values) in &injected {
            sampler.apply(SensorEvent::new(*sensor, values.clone()).into());
        }
        let store = MemoryStore::default();

        let outcome = perform_tick(
            sampler.state(),
            &store,
            LocationPolicy::OmitFields,
            Local::now(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, TickOutcome::Written(1));
        let record = &store.records()[0];
        for (sensor, values) in &injected {
            let expected = values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            assert_eq!(record.channels.get(*sensor), expected, "{sensor}");
        }
        let computed = record
            .channels
            .vector(SensorType::ComputedOrientation)
            .unwrap();
        assert!((computed[1] + std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        assert_eq!(record.location, None);
    }

    #[tokio::test]
    async fn skip_policy_waits_for_first_fix() {
        let state = SensorState::new();
        let store = MemoryStore::default();

        let outcome = perform_tick(&state, &store, LocationPolicy::SkipRecord, Local::now())
            .await
            .unwrap();
        assert_eq!(outcome, TickOutcome::Skipped);
        assert_eq!(store.len(), 0);

        state.replace_location(fix());
        let outcome = perform_tick(&state, &store, LocationPolicy::SkipRecord, Local::now())
            .await
            .unwrap();
        assert_eq!(outcome, TickOutcome::Written(1));
        assert_eq!(store.records()[0].location, Some(fix()));
    }

    #[tokio::test]
    async fn omit_policy_writes_without_location() {
        let state = SensorState::new();
        assert!(capture_snapshot(&state, "t".into(), LocationPolicy::OmitFields).is_some());
        assert!(capture_snapshot(&state, "t".into(), LocationPolicy::SkipRecord).is_none());
    }

    #[tokio::test]
    async fn store_failure_is_reported_not_panicked() {
        let state = SensorState::new();
        let store = MemoryStore::default();
        store.set_failing(true);

        let result = perform_tick(&state, &store, LocationPolicy::OmitFields, Local::now()).await;
        assert!(result.is_err());
    }

    #[test]
    fn timestamp_format_is_sortable() {
        let early = Local.with_ymd_and_hms(2024, 5, 1, 9, 59, 59).unwrap();
        let late = Local.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        let early = format_timestamp(&early);
        let late = format_timestamp(&late);
        assert_eq!(late, "2024-05-01 10:00:00.000");
        assert!(early < late);
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let future = Local::now() + chrono::Duration::hours(1);
        let mut last = Some(future);

        assert_eq!(next_timestamp(&mut last), future);
        assert_eq!(last, Some(future));
    }
}
