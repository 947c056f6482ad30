//! Atrium Scheduler
//!
//! The unattended path of the backup engine: a once-per-minute timer
//! that exports the full entity set to a timestamped archive file at a
//! configured time of day and prunes archives older than the retention
//! window.
//!
//! # Core Concepts
//!
//! - [`BackupScheduler`]: the tick state machine (`Idle → Running →
//!   Idle`), deterministic through [`BackupScheduler::tick`]
//! - [`ConfigSource`]: hot-reloadable settings, re-read every tick
//! - [`TickOutcome`] / [`SkipReason`]: what one tick did, and why not

mod config;
mod scheduler;

pub use config::{ConfigSource, FileConfigSource, SchedulerSettings, SharedConfig, StaticConfig};
pub use scheduler::{BackupScheduler, SchedulerError, SkipReason, TickOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
