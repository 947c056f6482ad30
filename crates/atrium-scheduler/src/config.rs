//! Scheduler configuration
//!
//! Settings are read through a [`ConfigSource`] once per tick and never
//! cached beyond it, so changes take effect at the next minute without a
//! restart.

use parking_lot::RwLock;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings consumed by the scheduler, re-read every tick
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Whether automated export runs at all
    pub enabled: bool,
    /// Trigger time of day, `HH:MM` local time
    pub trigger: String,
    /// Directory receiving timestamped archive files
    pub backup_dir: PathBuf,
    /// Archives older than this many days are pruned; `<= 0` disables
    pub retention_days: i64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            trigger: "02:00".to_string(),
            backup_dir: PathBuf::from("backups/auto"),
            retention_days: 7,
        }
    }
}

/// Hot-reloadable source of scheduler settings
pub trait ConfigSource: Send + Sync {
    /// Current settings; called once per tick
    fn snapshot(&self) -> SchedulerSettings;
}

/// Fixed settings, for wiring without a config file
#[derive(Debug, Clone)]
pub struct StaticConfig(SchedulerSettings);

impl StaticConfig {
    /// Wrap fixed settings
    #[must_use]
    pub fn new(settings: SchedulerSettings) -> Self {
        Self(settings)
    }
}

impl ConfigSource for StaticConfig {
    fn snapshot(&self) -> SchedulerSettings {
        self.0.clone()
    }
}

/// Mutable shared settings, updated while the scheduler runs
#[derive(Debug, Clone, Default)]
pub struct SharedConfig(Arc<RwLock<SchedulerSettings>>);

impl SharedConfig {
    /// Wrap initial settings
    #[must_use]
    pub fn new(settings: SchedulerSettings) -> Self {
        Self(Arc::new(RwLock::new(settings)))
    }

    /// Replace the settings seen by subsequent ticks
    pub fn update(&self, settings: SchedulerSettings) {
        *self.0.write() = settings;
    }
}

impl ConfigSource for SharedConfig {
    fn snapshot(&self) -> SchedulerSettings {
        self.0.read().clone()
    }
}

/// TOML-file-backed settings, re-read on every snapshot
///
/// A missing or unparsable file falls back to the supplied defaults; the
/// failure is logged once per tick.
#[derive(Debug)]
pub struct FileConfigSource {
    path: PathBuf,
    defaults: SchedulerSettings,
}

impl FileConfigSource {
    /// Read settings from `path`, with `defaults` as the fallback
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, defaults: SchedulerSettings) -> Self {
        Self {
            path: path.into(),
            defaults,
        }
    }

    /// File this source reads from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfigSource {
    fn snapshot(&self) -> SchedulerSettings {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(settings) => settings,
                Err(err) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %err,
                        "invalid scheduler config, using defaults"
                    );
                    self.defaults.clone()
                }
            },
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "unreadable scheduler config, using defaults"
                );
                self.defaults.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_parse_from_toml_with_defaults() {
        let settings: SchedulerSettings =
            toml::from_str("enabled = true\ntrigger = \"03:30\"\n").unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.trigger, "03:30");
        assert_eq!(settings.retention_days, 7);
        assert_eq!(settings.backup_dir, PathBuf::from("backups/auto"));
    }

    #[test]
    fn shared_config_updates_take_effect() {
        let shared = SharedConfig::new(SchedulerSettings::default());
        assert!(!shared.snapshot().enabled);
        shared.update(SchedulerSettings {
            enabled: true,
            ..SchedulerSettings::default()
        });
        assert!(shared.snapshot().enabled);
    }

    #[test]
    fn file_source_falls_back_on_missing_file() {
        let source = FileConfigSource::new("/nonexistent/atrium.toml", SchedulerSettings::default());
        assert_eq!(source.snapshot(), SchedulerSettings::default());
    }
}
