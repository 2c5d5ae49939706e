//! # Migration Engine
//!
//! A `Migrator` moves one page of access events into one destination table.
//! Records are processed in page order and independently: a record that
//! fails is counted, reported, and the page carries on.
//!
//! ## Per-record steps
//! 1. Parse the local alarm time; unparseable records are skipped.
//! 2. Require a pin and derive static attributes from the door catalog.
//! 3. Skip exact duplicates on `(time, pin)`.
//! 4. Skip when the pin's latest stored time is less than 30 minutes behind
//!    the upload clock.
//! 5. (iclock) Reconcile the employee's first name.
//! 6. Insert.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::catalog::DoorCatalog;
use super::rows::{IclockRow, MonitorLogRow, MonitorTarget};
use super::target::{TargetStore, TargetTable};
use crate::connections::{upload_clock, StoreError};
use crate::dss::{AccessEvent, AccessPage};
use crate::notify::{Failure, FailureReporter};

/// Suppression window per pin and table, in seconds.
pub const COOLDOWN_SECS: i64 = 1800;

/// Status recorded for per-record failures.
const RECORD_FAILURE_STATUS: u16 = 409;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    Duplicate,
    Cooldown,
    /// Not for this table (no pin, or another door).
    Rejected,
    Unparseable,
}

/// Counters for one page on one table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub cooldown: usize,
    pub rejected: usize,
    pub unparseable: usize,
    pub failed: usize,
}

impl MigrationReport {
    fn count(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Inserted => self.inserted += 1,
            Outcome::Duplicate => self.duplicates += 1,
            Outcome::Cooldown => self.cooldown += 1,
            Outcome::Rejected => self.rejected += 1,
            Outcome::Unparseable => self.unparseable += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.duplicates + self.cooldown + self.rejected + self.unparseable + self.failed
    }
}

/// Collaborators shared by every migrator.
#[derive(Clone)]
pub struct MigrationContext {
    pub store: Arc<dyn TargetStore>,
    pub catalog: Arc<DoorCatalog>,
    pub reporter: FailureReporter,
}

impl MigrationContext {
    /// Duplicate and cooldown checks; `Some` means skip.
    async fn screen(
        &self,
        table: TargetTable,
        time: NaiveDateTime,
        pin: &str,
        upload_time: NaiveDateTime,
    ) -> Result<Option<Outcome>, StoreError> {
        if self.store.exists(table, time, pin).await? {
            debug!(table = table.table_name(), pin, %time, "duplicate record skipped");
            return Ok(Some(Outcome::Duplicate));
        }

        if let Some(last) = self.store.last_time(table, pin).await? {
            if (upload_time - last).num_seconds() < COOLDOWN_SECS {
                debug!(table = table.table_name(), pin, %last, "record within cooldown skipped");
                return Ok(Some(Outcome::Cooldown));
            }
        }
        Ok(None)
    }
}

fn parse_time(event: &AccessEvent) -> Option<NaiveDateTime> {
    let time = event.local_time();
    if time.is_none() {
        warn!(
            alarm_time = ?event.alarm_time,
            person_id = ?event.person_id,
            "unparseable alarm time, record skipped"
        );
    }
    time
}

#[async_trait]
pub trait Migrator: Send + Sync {
    /// Short name used in logs and failure tags.
    fn name(&self) -> &'static str;

    fn table(&self) -> TargetTable;

    fn reporter(&self) -> &FailureReporter;

    async fn migrate_record(
        &self,
        event: &AccessEvent,
        upload_time: NaiveDateTime,
    ) -> Result<Outcome, MigrationError>;

    /// Migrates a page in order. `now` drives the upload clock.
    async fn migrate(&self, page: &AccessPage, now: DateTime<Utc>) -> MigrationReport {
        let upload_time = upload_clock(now);
        let mut report = MigrationReport::default();

        for event in &page.page_data {
            match self.migrate_record(event, upload_time).await {
                Ok(outcome) => report.count(outcome),
                Err(e) => {
                    report.failed += 1;
                    let failure = Failure::new(
                        self.table().database(),
                        format!("migrate_{}", self.name()),
                        RECORD_FAILURE_STATUS,
                        format!(
                            "failed to migrate record for pin {} into {}: {}",
                            event.person_id.as_deref().unwrap_or("?"),
                            self.table().table_name(),
                            e
                        ),
                    );
                    self.reporter().report(&failure).await;
                }
            }
        }

        info!(
            migrator = self.name(),
            inserted = report.inserted,
            duplicates = report.duplicates,
            cooldown = report.cooldown,
            rejected = report.rejected,
            unparseable = report.unparseable,
            failed = report.failed,
            "page migrated"
        );
        report
    }
}

/// Attendance punches into `iclock_transaction`.
pub struct IclockMigrator {
    ctx: MigrationContext,
}

impl IclockMigrator {
    pub fn new(ctx: MigrationContext) -> Self {
        Self { ctx }
    }

    /// Updates the stored first name when it differs from the vendor's.
    async fn reconcile_name(&self, pin: &str, first_name: Option<&str>) -> Result<(), StoreError> {
        let Some(first_name) = first_name else {
            return Ok(());
        };
        let Some(employee) = self.ctx.store.find_employee(pin).await? else {
            return Ok(());
        };
        if employee.emp_code == pin && employee.first_name.as_deref() != Some(first_name) {
            self.ctx.store.rename_employee(pin, first_name).await?;
            info!(pin, first_name, "employee name updated");
        }
        Ok(())
    }
}

#[async_trait]
impl Migrator for IclockMigrator {
    fn name(&self) -> &'static str {
        "iclock"
    }

    fn table(&self) -> TargetTable {
        TargetTable::Iclock
    }

    fn reporter(&self) -> &FailureReporter {
        &self.ctx.reporter
    }

    async fn migrate_record(
        &self,
        event: &AccessEvent,
        upload_time: NaiveDateTime,
    ) -> Result<Outcome, MigrationError> {
        let Some(time) = parse_time(event) else {
            return Ok(Outcome::Unparseable);
        };
        let Some(pin) = event.person_id.as_deref() else {
            debug!(point = event.point(), "event without person id rejected");
            return Ok(Outcome::Rejected);
        };

        let door = self.ctx.catalog.lookup(event.point());
        let row = IclockRow::derive(pin, time, &door, upload_time);

        if let Some(skip) = self.ctx.screen(self.table(), time, pin, upload_time).await? {
            return Ok(skip);
        }

        self.reconcile_name(pin, event.first_name.as_deref()).await?;
        self.ctx.store.insert_iclock(&row).await?;
        debug!(pin, %time, terminal = ?row.terminal_sn, "iclock record inserted");
        Ok(Outcome::Inserted)
    }
}

/// Dining-room accesses into one of the monitor logs.
pub struct MonitorLogMigrator {
    ctx: MigrationContext,
    target: &'static MonitorTarget,
}

impl MonitorLogMigrator {
    pub fn new(ctx: MigrationContext, target: &'static MonitorTarget) -> Self {
        Self { ctx, target }
    }
}

#[async_trait]
impl Migrator for MonitorLogMigrator {
    fn name(&self) -> &'static str {
        match self.target.table {
            TargetTable::AccMonitorSj => "acc_monitor_sj",
            _ => "acc_monitor",
        }
    }

    fn table(&self) -> TargetTable {
        self.target.table
    }

    fn reporter(&self) -> &FailureReporter {
        &self.ctx.reporter
    }

    async fn migrate_record(
        &self,
        event: &AccessEvent,
        upload_time: NaiveDateTime,
    ) -> Result<Outcome, MigrationError> {
        let Some(time) = parse_time(event) else {
            return Ok(Outcome::Unparseable);
        };
        let Some(pin) = event.person_id.as_deref() else {
            return Ok(Outcome::Rejected);
        };
        if event.point() != self.target.door {
            debug!(point = event.point(), table = self.table().table_name(), "door not routed here");
            return Ok(Outcome::Rejected);
        }

        if let Some(skip) = self.ctx.screen(self.table(), time, pin, upload_time).await? {
            return Ok(skip);
        }

        let row = MonitorLogRow::new(self.target, time, pin);
        self.ctx.store.insert_monitor(&row).await?;
        debug!(pin, %time, table = self.table().table_name(), "monitor record inserted");
        Ok(Outcome::Inserted)
    }
}
