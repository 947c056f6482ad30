//! Scheduled backup export
//!
//! A single recurring timer drives [`BackupScheduler::run`]; each tick
//! checks, in order: an in-flight guard, the enabled flag, the `HH:MM`
//! trigger match and the same-day run key, then exports the full entity
//! set to a timestamped archive file and prunes files older than the
//! retention window. Failures are logged and never crash the loop; the
//! run key is only recorded after success, so the next matching tick
//! retries.

use crate::config::{ConfigSource, SchedulerSettings};
use atrium_domain::EntityGraph;
use atrium_engine::{EngineError, Exporter, OpContext};
use atrium_store::EntityStore;
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate, Timelike, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Why a tick did not export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A run is already in flight
    InFlight,
    /// Automated export is disabled by configuration
    Disabled,
    /// The configured trigger is not a valid `HH:MM` time
    InvalidTrigger,
    /// The current minute does not match the trigger
    NotDue,
    /// A run already completed for today's date
    AlreadyRan,
}

/// Outcome of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick did not export
    Skipped(SkipReason),
    /// An archive was written and old files pruned
    Completed {
        /// Path of the written archive file
        archive_path: PathBuf,
        /// Number of pruned files
        pruned: u64,
    },
    /// The run failed; logged, run key not recorded
    Failed,
}

/// Errors inside one scheduled run
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Export failed
    #[error("export failed: {0}")]
    Export(#[from] EngineError),

    /// The archive could not be serialized
    #[error("archive serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing or pruning the backup directory failed
    #[error("backup directory I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Drives automated exports from a recurring one-minute timer
pub struct BackupScheduler {
    graph: Arc<EntityGraph>,
    exporter: Exporter,
    config: Arc<dyn ConfigSource>,
    running: bool,
    last_run_key: Option<NaiveDate>,
}

impl BackupScheduler {
    /// Create a scheduler exporting from `store`
    #[must_use]
    pub fn new(
        graph: Arc<EntityGraph>,
        store: Arc<dyn EntityStore>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        let exporter = Exporter::new(Arc::clone(&graph), store);
        Self {
            graph,
            exporter,
            config,
            running: false,
            last_run_key: None,
        }
    }

    /// Tick once per minute until the task is torn down
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick(Local::now()).await;
        }
    }

    /// Evaluate one tick at the given wall-clock time
    ///
    /// Public so hosts and tests can drive the schedule deterministically.
    pub async fn tick(&mut self, now: DateTime<Local>) -> TickOutcome {
        if self.running {
            return TickOutcome::Skipped(SkipReason::InFlight);
        }
        let settings = self.config.snapshot();
        if !settings.enabled {
            return TickOutcome::Skipped(SkipReason::Disabled);
        }
        let Some((hour, minute)) = parse_trigger(&settings.trigger) else {
            tracing::warn!(trigger = %settings.trigger, "invalid backup trigger, expected HH:MM");
            return TickOutcome::Skipped(SkipReason::InvalidTrigger);
        };
        if now.hour() != hour || now.minute() != minute {
            return TickOutcome::Skipped(SkipReason::NotDue);
        }
        let run_key = now.date_naive();
        if self.last_run_key == Some(run_key) {
            return TickOutcome::Skipped(SkipReason::AlreadyRan);
        }

        self.running = true;
        let outcome = self.run_backup(&settings, now).await;
        self.running = false;

        match outcome {
            Ok((archive_path, pruned)) => {
                self.last_run_key = Some(run_key);
                tracing::info!(
                    path = %archive_path.display(),
                    pruned,
                    "automated backup complete"
                );
                TickOutcome::Completed {
                    archive_path,
                    pruned,
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "automated backup failed");
                TickOutcome::Failed
            }
        }
    }

    /// Export everything, write the archive file, prune old archives
    async fn run_backup(
        &self,
        settings: &SchedulerSettings,
        now: DateTime<Local>,
    ) -> Result<(PathBuf, u64), SchedulerError> {
        let selection = self.graph.full_selection();
        let archive = self
            .exporter
            .export(&selection, &OpContext::unbounded())
            .await?;

        tokio::fs::create_dir_all(&settings.backup_dir).await?;
        let filename = format!("atrium-backup-{}.json", now.format("%Y-%m-%dT%H-%M-%S"));
        let path = settings.backup_dir.join(filename);
        let bytes = serde_json::to_vec_pretty(&archive)?;
        tokio::fs::write(&path, bytes).await?;

        let pruned = prune_old(&settings.backup_dir, settings.retention_days, now).await?;
        Ok((path, pruned))
    }
}

/// Delete files in `dir` modified before the retention cutoff
///
/// Individual file failures are logged and skipped; only listing the
/// directory is fatal.
async fn prune_old(
    dir: &Path,
    retention_days: i64,
    now: DateTime<Local>,
) -> Result<u64, SchedulerError> {
    if retention_days <= 0 {
        return Ok(0);
    }
    let cutoff =
        SystemTime::from(now.with_timezone(&Utc) - ChronoDuration::days(retention_days));

    let mut pruned = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let Ok(modified) = meta.modified() else {
            continue;
        };
        if modified >= cutoff {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => pruned += 1,
            Err(err) => {
                tracing::debug!(
                    path = %entry.path().display(),
                    error = %err,
                    "failed to prune backup file"
                );
            }
        }
    }
    Ok(pruned)
}

/// Parse a `HH:MM` trigger into hour and minute
fn parse_trigger(value: &str) -> Option<(u32, u32)> {
    let (hours, minutes) = value.trim().split_once(':')?;
    let hour: u32 = hours.parse().ok()?;
    let minute: u32 = minutes.parse().ok()?;
    (hour <= 23 && minute <= 59).then_some((hour, minute))
}
