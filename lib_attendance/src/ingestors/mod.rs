//! # Ingestors Module
//!
//! The polling side of the service. Three independent work items, one per
//! destination table family, each with its own watermark, share only the
//! vendor session (through the fetcher) and the store. A fourth, on-demand
//! path reads the last week of records without migrating them.
//!
//! ## Contained Modules:
//! - **`work_item`**: the self-scheduling fetch/advance/fan-out loop.
//! - **`backfill`**: the read-only seven-day passthrough.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::configs::{keys, Settings};
use crate::connections::Database;
use crate::dss::RecordFetcher;
use crate::migration::{
    IclockMigrator, MigrationContext, Migrator, MonitorLogMigrator, ACC_MONITOR, ACC_MONITOR_SJ,
};

/// The periodic fetch/migrate loop.
pub mod work_item;

/// Seven-day read-only fetch.
pub mod backfill;

pub use backfill::WeeklyBackfill;
pub use work_item::{CycleOutcome, TaskSpec, WorkItem, MIN_INTERVAL};

/// Polling interval of the standard tasks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

pub const ICLOCK_TASK: TaskSpec = TaskSpec {
    name: "iclock",
    lookback: keys::LOOKBACK_ICLOCK,
    record_limit: keys::RECORD_LIMIT_ICLOCK,
    database: Database::Attendance,
    interval: DEFAULT_INTERVAL,
};

pub const ACC_MONITOR_TASK: TaskSpec = TaskSpec {
    name: "acc_monitor",
    lookback: keys::LOOKBACK_ACC_MONITOR,
    record_limit: keys::RECORD_LIMIT_ACC_MONITOR,
    database: Database::Control,
    interval: DEFAULT_INTERVAL,
};

pub const ACC_MONITOR_SJ_TASK: TaskSpec = TaskSpec {
    name: "acc_monitor_sj",
    lookback: keys::LOOKBACK_ACC_MONITOR_SJ,
    record_limit: keys::RECORD_LIMIT_ACC_MONITOR_SJ,
    database: Database::Control,
    interval: DEFAULT_INTERVAL,
};

/// Builds the three standard work items, each with its single migrator.
pub fn standard_work_items(
    settings: &Settings,
    fetcher: &Arc<RecordFetcher>,
    ctx: &MigrationContext,
) -> Vec<WorkItem> {
    let item = |spec: TaskSpec, migrator: Arc<dyn Migrator>| {
        WorkItem::new(
            spec,
            settings.clone(),
            Arc::clone(fetcher),
            vec![migrator],
            ctx.reporter.clone(),
        )
    };

    vec![
        item(ICLOCK_TASK, Arc::new(IclockMigrator::new(ctx.clone()))),
        item(
            ACC_MONITOR_TASK,
            Arc::new(MonitorLogMigrator::new(ctx.clone(), &ACC_MONITOR)),
        ),
        item(
            ACC_MONITOR_SJ_TASK,
            Arc::new(MonitorLogMigrator::new(ctx.clone(), &ACC_MONITOR_SJ)),
        ),
    ]
}

/// Spawns every item as a detached task stopped by `cancel`.
pub fn spawn_all(items: Vec<WorkItem>, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
    items
        .into_iter()
        .map(|item| {
            info!(task = item.name(), interval_ms = item.interval().as_millis() as u64, "spawning work item");
            tokio::spawn(item.run(cancel.child_token()))
        })
        .collect()
}
