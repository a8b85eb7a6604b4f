use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

/// What the recorder does on a tick when no location fix has arrived yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationPolicy {
    /// Write the record with empty location columns.
    #[default]
    OmitFields,
    /// Skip the whole tick until the first fix.
    SkipRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecorderSettings {
    pub saving_interval_ms: u64,
    /// Requested sensor sampling period, in microseconds.
    pub sampling_period_us: u64,
    /// Requested maximum batching latency, in microseconds.
    pub max_report_latency_us: u64,
    pub location_interval_ms: u64,
    pub location_policy: LocationPolicy,
    pub database_file: String,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            saving_interval_ms: 500,
            sampling_period_us: 500_000,
            max_report_latency_us: 500_000,
            location_interval_ms: 500,
            location_policy: LocationPolicy::OmitFields,
            database_file: "sensor_values.db".into(),
        }
    }
}

impl RecorderSettings {
    pub fn saving_interval(&self) -> Duration {
        // A zero period would make tokio::time::interval panic.
        Duration::from_millis(self.saving_interval_ms.max(1))
    }

    pub fn sampling_period(&self) -> Duration {
        Duration::from_micros(self.sampling_period_us)
    }

    pub fn max_report_latency(&self) -> Duration {
        Duration::from_micros(self.max_report_latency_us)
    }

    pub fn location_interval(&self) -> Duration {
        Duration::from_millis(self.location_interval_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    #[serde(default)]
    recorder: RecorderSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring unreadable settings at {}: {err}",
                    path.display()
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn recorder(&self) -> RecorderSettings {
        self.read().recorder.clone()
    }

    pub fn update_recorder(&self, settings: RecorderSettings) -> Result<()> {
        let mut guard = self.write();
        guard.recorder = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = SettingsStore::new(temp_dir.path().join("settings.json")).unwrap();

        let settings = store.recorder();
        assert_eq!(settings, RecorderSettings::default());
        assert_eq!(settings.saving_interval(), Duration::from_millis(500));
        assert_eq!(settings.sampling_period(), Duration::from_millis(500));
        assert_eq!(settings.location_policy, LocationPolicy::OmitFields);
    }

    #[test]
    fn update_persists_and_reloads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.recorder();
        settings.location_policy = LocationPolicy::SkipRecord;
        settings.saving_interval_ms = 250;
        store.update_recorder(settings.clone()).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.recorder(), settings);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, r#"{"recorder":{"location_policy":"skip_record"}}"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().recorder();
        assert_eq!(settings.location_policy, LocationPolicy::SkipRecord);
        assert_eq!(settings.saving_interval_ms, 500);
        assert_eq!(settings.database_file, "sensor_values.db");
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.recorder(), RecorderSettings::default());
    }

    #[test]
    fn zero_interval_is_clamped() {
        let settings = RecorderSettings {
            saving_interval_ms: 0,
            ..RecorderSettings::default()
        };
        assert_eq!(settings.saving_interval(), Duration::from_millis(1));
    }
}
