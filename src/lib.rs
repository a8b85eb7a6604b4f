pub mod db;
pub mod orientation;
pub mod recorder;
pub mod sensors;
pub mod settings;
mod utils;

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;

use db::{Database, SnapshotRecord};
use recorder::{RecorderController, RecorderStats};
use sensors::{SamplerController, SamplingRequest, SensorSampler, SensorSource, SensorState};
use settings::{RecorderSettings, SettingsStore};

const DATA_DIR_ENV: &str = "SENSORDEMO_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "data";

/// Everything the application wires together at startup.
pub struct AppState {
    pub db: Database,
    pub sensors: SensorState,
    pub sampler: SamplerController,
    pub recorder: RecorderController<Database>,
    pub settings: SettingsStore,
}

impl AppState {
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        info!("Settings path: {}", settings.path().display());
        let recorder_settings = settings.recorder();

        let db_path = data_dir.join(&recorder_settings.database_file);
        let db = Database::new(db_path)?;
        info!("Local database path: {}", db.path().display());

        let sensors = SensorState::new();
        let sampler = SamplerController::new(
            SensorSampler::new(sensors.clone()),
            sampling_request(&recorder_settings),
        );
        let recorder = RecorderController::new(sensors.clone(), db.clone(), recorder_settings);

        Ok(Self {
            db,
            sensors,
            sampler,
            recorder,
            settings,
        })
    }
}

fn sampling_request(settings: &RecorderSettings) -> SamplingRequest {
    SamplingRequest {
        sampling_period: settings.sampling_period(),
        max_report_latency: settings.max_report_latency(),
        location_interval: Some(settings.location_interval()),
    }
}

pub fn data_dir_from_env() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub database: PathBuf,
    pub settings: RecorderSettings,
    pub stats: RecorderStats,
    pub stored_records: u64,
    pub latest: Option<SnapshotRecord>,
}

/// Samples `source` and records snapshots until the source ends or Ctrl-C arrives.
pub async fn run(source: &dyn SensorSource, data_dir: &Path) -> Result<RunSummary> {
    run_until(source, data_dir, interrupted()).await
}

/// Resolves on Ctrl-C. If the handler cannot be installed, only the source ending stops the run.
async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupted; shutting down"),
        Err(err) => {
            warn!("failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    }
}

/// Like [`run`], with `shutdown` in place of Ctrl-C.
pub async fn run_until(
    source: &dyn SensorSource,
    data_dir: &Path,
    shutdown: impl Future<Output = ()>,
) -> Result<RunSummary> {
    let mut app = AppState::new(data_dir)?;

    app.sampler.register(source)?;
    if let Err(err) = app.recorder.start() {
        app.sampler.unregister().await?;
        return Err(err);
    }

    let source_closed = app.sampler.source_closed();
    tokio::select! {
        _ = source_closed.cancelled() => info!("Sensor input finished"),
        _ = shutdown => {}
    }

    // Both halves always shut down; the first error wins.
    let stopped = app.recorder.stop().await;
    let unregistered = app.sampler.unregister().await;
    stopped?;
    unregistered?;

    for ty in sensors::SensorType::ALL {
        info!(
            "{}: {}",
            ty.label(),
            sensors::join_components(&app.sensors.latest(ty))
        );
    }

    Ok(RunSummary {
        database: app.db.path().to_path_buf(),
        settings: app.settings.recorder(),
        stats: app.recorder.stats(),
        stored_records: app.db.count_snapshots().await?,
        latest: app.db.latest_snapshot().await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensors::{ReplaySource, SensorType};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn app_state_wires_shared_sensor_state() {
        let temp_dir = TempDir::new().unwrap();
        let app = AppState::new(temp_dir.path()).unwrap();

        assert!(temp_dir.path().join("sensor_values.db").exists());
        app.sampler
            .sampler()
            .apply(sensors::SensorEvent::new(SensorType::Gravity, [0.0, 9.81, 0.0]).into());
        assert_eq!(app.sensors.latest(SensorType::Gravity), vec![0.0, 9.81, 0.0]);
    }

    #[tokio::test]
    async fn run_records_replayed_input() {
        let temp_dir = TempDir::new().unwrap();
        let input = "\
accelerometer 0 9.8 0
magnetic_field 20 0 -40
location 55.75 37.62 150 4 1.2 0.5 90 10
sleep 1200
gyroscope 0.1 0.2 0.3
sleep 100
";
        let source = ReplaySource::new(BufReader::new(input.as_bytes()));

        let summary = run(&source, temp_dir.path()).await.unwrap();

        assert!(summary.stored_records >= 2);
        assert_eq!(summary.stored_records, summary.stats.records_written);
        let latest = summary.latest.unwrap();
        assert_eq!(latest.channels.accelerometer, "0 9.8 0");
        assert_eq!(latest.channels.magnetic_field, "20 0 -40");
        assert!(latest.location.is_some());
    }

    #[tokio::test]
    async fn shutdown_stops_a_run_whose_input_never_ends() {
        let temp_dir = TempDir::new().unwrap();
        let (line_tx, line_rx) = tokio::sync::mpsc::unbounded_channel();
        line_tx.send("gravity 0 9.81 0".to_string()).unwrap();
        let source = ReplaySource::from_lines(line_rx);

        let shutdown = tokio::time::sleep(Duration::from_millis(300));
        let summary = tokio::time::timeout(
            Duration::from_secs(5),
            run_until(&source, temp_dir.path(), shutdown),
        )
        .await
        .expect("run ignored the shutdown future")
        .unwrap();

        // The first tick fires immediately.
        assert!(summary.stats.records_written >= 1);
        assert_eq!(summary.stored_records, summary.stats.records_written);
        assert_eq!(summary.settings, RecorderSettings::default());
        // The replay loop was torn down even though the sender is still open.
        assert!(line_tx.is_closed());
    }
}
