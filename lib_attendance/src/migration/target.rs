//! # Destination Tables
//!
//! The lookups and inserts the migrators perform, behind `TargetStore`.
//! `SqlTargetStore` maps them onto the relational store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::rows::{IclockRow, MonitorLogRow, ICLOCK_COLUMNS, MONITOR_COLUMNS};
use crate::connections::{Database, RelationalStore, SqlValue, StoreError};

/// Destination tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetTable {
    Iclock,
    AccMonitor,
    AccMonitorSj,
}

impl TargetTable {
    pub fn database(self) -> Database {
        match self {
            TargetTable::Iclock => Database::Attendance,
            TargetTable::AccMonitor | TargetTable::AccMonitorSj => Database::Control,
        }
    }

    pub fn table_name(self) -> &'static str {
        match self {
            TargetTable::Iclock => "iclock_transaction",
            TargetTable::AccMonitor => "acc_monitor_log",
            TargetTable::AccMonitorSj => "acc_monitor_log_sj",
        }
    }

    fn time_column(self) -> &'static str {
        match self {
            TargetTable::Iclock => "punch_time",
            TargetTable::AccMonitor | TargetTable::AccMonitorSj => "\"time\"",
        }
    }

    fn pin_column(self) -> &'static str {
        match self {
            TargetTable::Iclock => "emp_code",
            TargetTable::AccMonitor | TargetTable::AccMonitorSj => "pin",
        }
    }
}

/// Row of `personnel_employee` relevant to name reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    pub emp_code: String,
    pub first_name: Option<String>,
}

#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Whether a row with exactly this `(time, pin)` exists.
    async fn exists(&self, table: TargetTable, time: NaiveDateTime, pin: &str)
        -> Result<bool, StoreError>;

    /// Latest stored time for `pin`.
    async fn last_time(&self, table: TargetTable, pin: &str)
        -> Result<Option<NaiveDateTime>, StoreError>;

    async fn insert_iclock(&self, row: &IclockRow) -> Result<(), StoreError>;

    async fn insert_monitor(&self, row: &MonitorLogRow) -> Result<(), StoreError>;

    async fn find_employee(&self, emp_code: &str) -> Result<Option<Employee>, StoreError>;

    /// Returns the number of updated rows.
    async fn rename_employee(&self, emp_code: &str, first_name: &str) -> Result<u64, StoreError>;
}

/// `TargetStore` over the relational store.
#[derive(Clone)]
pub struct SqlTargetStore {
    store: Arc<dyn RelationalStore>,
}

impl SqlTargetStore {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TargetStore for SqlTargetStore {
    async fn exists(
        &self,
        table: TargetTable,
        time: NaiveDateTime,
        pin: &str,
    ) -> Result<bool, StoreError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1 AND {} = $2",
            table.table_name(),
            table.time_column(),
            table.pin_column()
        );
        let row = self
            .store
            .select_one(table.database(), &sql, &[SqlValue::from(time), SqlValue::from(pin)])
            .await?;
        let count = row
            .and_then(|cols| cols.first().and_then(SqlValue::as_i64))
            .unwrap_or(0);
        Ok(count > 0)
    }

    async fn last_time(
        &self,
        table: TargetTable,
        pin: &str,
    ) -> Result<Option<NaiveDateTime>, StoreError> {
        let sql = format!(
            "SELECT MAX({}) FROM {} WHERE {} = $1",
            table.time_column(),
            table.table_name(),
            table.pin_column()
        );
        let row = self
            .store
            .select_one(table.database(), &sql, &[SqlValue::from(pin)])
            .await?;
        Ok(row.and_then(|cols| cols.first().and_then(SqlValue::as_timestamp)))
    }

    async fn insert_iclock(&self, row: &IclockRow) -> Result<(), StoreError> {
        let table = TargetTable::Iclock;
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.table_name(),
            ICLOCK_COLUMNS,
            placeholders(17)
        );
        self.store
            .insert(table.database(), &sql, &row.to_params())
            .await?;
        Ok(())
    }

    async fn insert_monitor(&self, row: &MonitorLogRow) -> Result<(), StoreError> {
        let table = row.target.table;
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.table_name(),
            MONITOR_COLUMNS,
            placeholders(11)
        );
        self.store
            .insert(table.database(), &sql, &row.to_params())
            .await?;
        Ok(())
    }

    async fn find_employee(&self, emp_code: &str) -> Result<Option<Employee>, StoreError> {
        let row = self
            .store
            .select_one(
                Database::Attendance,
                "SELECT emp_code, first_name FROM personnel_employee WHERE emp_code = $1",
                &[SqlValue::from(emp_code)],
            )
            .await?;

        Ok(row.and_then(|cols| {
            let emp_code = cols.first().and_then(SqlValue::to_text)?;
            let first_name = cols.get(1).and_then(SqlValue::to_text);
            Some(Employee {
                emp_code,
                first_name,
            })
        }))
    }

    async fn rename_employee(&self, emp_code: &str, first_name: &str) -> Result<u64, StoreError> {
        self.store
            .update(
                Database::Attendance,
                "UPDATE personnel_employee SET first_name = $1 WHERE emp_code = $2",
                &[SqlValue::from(first_name), SqlValue::from(emp_code)],
            )
            .await
    }
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("${i}")).collect::<Vec<_>>().join(", ")
}
