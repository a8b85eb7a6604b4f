use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::sensors::SensorState;
use crate::settings::RecorderSettings;

use super::loop_worker::recording_loop;
use super::stats::{RecorderStats, StatsCounters};
use super::SnapshotStore;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RecorderStatus {
    Idle,
    Running,
    /// Stop requested; the loop is finishing its in-flight write.
    Stopping,
}

#[derive(Default)]
struct RecorderTask {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

/// Starts and stops the periodic snapshot loop. At most one loop runs at a time.
#[derive(Clone)]
pub struct RecorderController<S: SnapshotStore> {
    sensors: SensorState,
    store: S,
    settings: RecorderSettings,
    task: Arc<Mutex<RecorderTask>>,
    counters: Arc<StatsCounters>,
}

impl<S: SnapshotStore> RecorderController<S> {
    pub fn new(sensors: SensorState, store: S, settings: RecorderSettings) -> Self {
        Self {
            sensors,
            store,
            settings,
            task: Arc::new(Mutex::new(RecorderTask::default())),
            counters: Arc::new(StatsCounters::default()),
        }
    }

    pub fn status(&self) -> RecorderStatus {
        let task = self.lock();
        match (&task.handle, &task.cancel_token) {
            (Some(handle), _) if handle.is_finished() => RecorderStatus::Idle,
            (Some(_), Some(token)) if token.is_cancelled() => RecorderStatus::Stopping,
            (Some(_), _) => RecorderStatus::Running,
            (None, _) => RecorderStatus::Idle,
        }
    }

    pub fn stats(&self) -> RecorderStats {
        self.counters.snapshot()
    }

    /// Spawns the recording loop. Fails if a loop is already running or still stopping.
    pub fn start(&self) -> Result<()> {
        let mut task = self.lock();

        if let Some(handle) = &task.handle {
            if !handle.is_finished() {
                let stopping = task
                    .cancel_token
                    .as_ref()
                    .is_some_and(CancellationToken::is_cancelled);
                if stopping {
                    bail!("recorder is still stopping");
                }
                bail!("recorder already running");
            }
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(recording_loop(
            self.sensors.clone(),
            self.store.clone(),
            self.settings.clone(),
            cancel_token.clone(),
            Arc::clone(&self.counters),
        ));

        task.handle = Some(handle);
        task.cancel_token = Some(cancel_token);

        log_info!(
            "Recorder started (every {}ms, location policy {:?})",
            self.settings.saving_interval().as_millis(),
            self.settings.location_policy
        );
        Ok(())
    }

    /// Signals the loop to stop without waiting. Safe to call from any thread.
    pub fn request_stop(&self) {
        if let Some(token) = &self.lock().cancel_token {
            token.cancel();
        }
    }

    /// Stops the loop and waits for any in-flight write. No record is written after this returns.
    pub async fn stop(&self) -> Result<()> {
        let (handle, cancel_token) = {
            let mut task = self.lock();
            (task.handle.take(), task.cancel_token.take())
        };

        if let Some(token) = cancel_token {
            token.cancel();
        }

        if let Some(handle) = handle {
            handle
                .await
                .context("recording loop task failed to join")?;
            log_info!("Recorder stopped");
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, RecorderTask> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
