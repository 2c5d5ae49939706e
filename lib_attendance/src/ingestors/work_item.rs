//! # Polling Work Item
//!
//! One self-scheduling poller per destination table family. Each cycle:
//!
//! 1. Reads the page size from the parameter table.
//! 2. Fetches `[watermark, now + 5h]` from the vendor.
//! 3. Advances the watermark to the page's latest event minus a 10 s overlap.
//! 4. Fans the page out to every migrator of the item and waits for all.
//!
//! The watermark starts at `now - lookback` (a parameter) and only moves
//! forward. An empty page or a failed fetch leaves it untouched and the next
//! tick tries again.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::configs::{ParamKey, Settings};
use crate::connections::Database;
use crate::dss::{AccessPage, FetchWindow, RecordFetcher};
use crate::migration::{MigrationReport, Migrator};
use crate::notify::{Failure, FailureReporter};

/// Lead added past "now" to the upper bound of the fetch window.
pub const WINDOW_LEAD_HOURS: i64 = 5;
/// Overlap kept behind the newest event so boundary records are re-read.
pub const WATERMARK_OVERLAP_SECS: i64 = 10;
/// Lower bound of any polling interval.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

const TASK_FAILURE_STATUS: u16 = 500;

/// Static description of a polling task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: &'static str,
    /// Hours to look back when the task starts.
    pub lookback: ParamKey,
    /// Page size of every fetch.
    pub record_limit: ParamKey,
    /// Database whose audit log receives the task's failures.
    pub database: Database,
    pub interval: Duration,
}

impl TaskSpec {
    /// Clamps the polling interval to `MIN_INTERVAL`.
    pub fn every(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The lookback parameter could not be read; nothing was fetched.
    ConfigUnavailable,
    FetchFailed,
    Empty,
    Fetched {
        records: usize,
        reports: Vec<MigrationReport>,
    },
}

pub struct WorkItem {
    spec: TaskSpec,
    settings: Settings,
    fetcher: Arc<RecordFetcher>,
    migrators: Vec<Arc<dyn Migrator>>,
    reporter: FailureReporter,
    watermark: Option<i64>,
}

impl WorkItem {
    pub fn new(
        spec: TaskSpec,
        settings: Settings,
        fetcher: Arc<RecordFetcher>,
        migrators: Vec<Arc<dyn Migrator>>,
        reporter: FailureReporter,
    ) -> Self {
        Self {
            spec: spec.every(spec.interval),
            settings,
            fetcher,
            migrators,
            reporter,
            watermark: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn interval(&self) -> Duration {
        self.spec.interval
    }

    /// Lower bound of the next fetch window, once initialized.
    pub fn watermark(&self) -> Option<i64> {
        self.watermark
    }

    async fn ensure_watermark(&mut self, now: DateTime<Utc>) -> Option<i64> {
        if let Some(mark) = self.watermark {
            return Some(mark);
        }
        match self.settings.parse::<i64>(self.spec.lookback).await {
            Ok(hours) => {
                let mark = now.timestamp() - hours * 3600;
                info!(task = self.spec.name, lookback_hours = hours, watermark = mark, "watermark initialized");
                self.watermark = Some(mark);
                Some(mark)
            }
            Err(e) => {
                warn!(task = self.spec.name, error = %e, "lookback unavailable, cycle skipped");
                None
            }
        }
    }

    async fn report(&self, stage: &str, message: String) {
        let failure = Failure::new(
            self.spec.database,
            format!("{stage}_{}", self.spec.name),
            TASK_FAILURE_STATUS,
            message,
        );
        self.reporter.report(&failure).await;
    }

    async fn fetch(&self, start: i64, now: DateTime<Utc>) -> Result<AccessPage, String> {
        let page_size = self
            .settings
            .parse::<u32>(self.spec.record_limit)
            .await
            .map_err(|e| e.to_string())?;
        let end = (now + chrono::Duration::hours(WINDOW_LEAD_HOURS)).timestamp();
        let window = FetchWindow::first_page(start, end, page_size);

        self.fetcher
            .fetch_page(&window, None)
            .await
            .map_err(|e| e.to_string())
    }

    fn advance(&mut self, page: &AccessPage) {
        let Some(newest) = page.max_epoch() else {
            return;
        };
        let candidate = newest - WATERMARK_OVERLAP_SECS;
        match self.watermark {
            Some(mark) if candidate <= mark => {
                debug!(task = self.spec.name, watermark = mark, candidate, "watermark kept");
            }
            _ => {
                debug!(task = self.spec.name, watermark = candidate, "watermark advanced");
                self.watermark = Some(candidate);
            }
        }
    }

    /// Runs the migrators concurrently, one task each.
    async fn dispatch(&self, page: AccessPage, now: DateTime<Utc>) -> Vec<MigrationReport> {
        let page = Arc::new(page);
        let handles = self.migrators.iter().map(|migrator| {
            let migrator = Arc::clone(migrator);
            let page = Arc::clone(&page);
            tokio::spawn(async move { migrator.migrate(&page, now).await })
        });

        let mut reports = Vec::with_capacity(self.migrators.len());
        for result in join_all(handles).await {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    self.report("migrate", format!("[{}] migration error: {e}", self.spec.name))
                        .await
                }
            }
        }
        reports
    }

    /// One fetch-and-migrate cycle at `now`.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleOutcome {
        // --- Phase 1: Watermark ---
        let Some(start) = self.ensure_watermark(now).await else {
            return CycleOutcome::ConfigUnavailable;
        };

        // --- Phase 2: Fetch ---
        let page = match self.fetch(start, now).await {
            Ok(page) => page,
            Err(e) => {
                self.report("fetch", format!("[{}] error fetching data: {e}", self.spec.name))
                    .await;
                return CycleOutcome::FetchFailed;
            }
        };
        if page.is_empty() {
            debug!(task = self.spec.name, "no data to process");
            return CycleOutcome::Empty;
        }

        // --- Phase 3: Advance ---
        self.advance(&page);

        // --- Phase 4: Fan-out ---
        let records = page.len();
        let reports = self.dispatch(page, now).await;
        CycleOutcome::Fetched { records, reports }
    }

    /// Polls until cancelled, sleeping one full interval before every cycle.
    pub async fn run(mut self, cancel: CancellationToken) {
        let period = self.spec.interval;
        info!(task = self.spec.name, interval_ms = period.as_millis() as u64, "work item started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep(period) => {
                    self.run_cycle(Utc::now()).await;
                }
            }
        }
        info!(task = self.spec.name, "work item stopped");
    }
}
