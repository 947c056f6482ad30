//! Atrium backup daemon
//!
//! Seeds the baseline state and drives the backup scheduler against the
//! reference in-memory store. Real deployments swap in the portal's
//! store driver behind the same [`atrium_store::EntityStore`] seam.

use atrium_domain::EntityGraph;
use atrium_engine::{seed, OpContext};
use atrium_scheduler::{
    BackupScheduler, ConfigSource, FileConfigSource, SchedulerSettings, StaticConfig,
};
use atrium_store::MemoryStore;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "atriumd", version, about = "Atrium scheduled backup daemon")]
struct Cli {
    /// Scheduler TOML config, re-read every tick
    #[arg(long, env = "ATRIUM_SCHEDULER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable automated export (without a config file)
    #[arg(long)]
    enabled: bool,

    /// Trigger time of day, HH:MM local
    #[arg(long)]
    trigger: Option<String>,

    /// Directory receiving archive files
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Prune archives older than this many days
    #[arg(long)]
    retention_days: Option<i64>,
}

impl Cli {
    fn settings(&self) -> SchedulerSettings {
        let mut settings = SchedulerSettings {
            enabled: self.enabled,
            ..SchedulerSettings::default()
        };
        if let Some(trigger) = &self.trigger {
            settings.trigger.clone_from(trigger);
        }
        if let Some(dir) = &self.backup_dir {
            settings.backup_dir.clone_from(dir);
        }
        if let Some(days) = self.retention_days {
            settings.retention_days = days;
        }
        settings
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();
    let source: Arc<dyn ConfigSource> = match &cli.config {
        Some(path) => Arc::new(FileConfigSource::new(path.clone(), settings)),
        None => Arc::new(StaticConfig::new(settings)),
    };

    let graph = Arc::new(EntityGraph::new());
    let store = MemoryStore::new(Arc::clone(&graph));
    seed::seed_baseline(&store, &OpContext::unbounded()).await?;

    tracing::info!("atriumd started");
    BackupScheduler::new(graph, Arc::new(store), source)
        .run()
        .await;
    Ok(())
}
