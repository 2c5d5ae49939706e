//! # Audit Log
//!
//! Failures that operators should see without reading process logs are
//! written to `logs_info` in the database of the component that failed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::store::{upload_clock, Database, RelationalStore, SqlValue, StoreError};

const INSERT_LOG: &str = "INSERT INTO logs_info (id_group, log_time, log_level, message, endpoint, status_code) \
     VALUES ($1, $2, $3, $4, $5, $6)";

/// `id_group` of a log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogGroup {
    Error = 1,
    Info = 2,
}

impl LogGroup {
    pub fn level(self) -> &'static str {
        match self {
            LogGroup::Error => "ERROR",
            LogGroup::Info => "INFO",
        }
    }
}

/// One row of `logs_info`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub database: Database,
    pub group: LogGroup,
    pub message: String,
    pub endpoint: String,
    pub status_code: u16,
}

impl AuditEntry {
    pub fn error(
        database: Database,
        message: impl Into<String>,
        endpoint: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self {
            database,
            group: LogGroup::Error,
            message: message.into(),
            endpoint: endpoint.into(),
            status_code,
        }
    }

    pub fn info(
        database: Database,
        message: impl Into<String>,
        endpoint: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self {
            group: LogGroup::Info,
            ..Self::error(database, message, endpoint, status_code)
        }
    }
}

/// Writer for `logs_info`.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn RelationalStore>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    /// Inserts the entry stamped with the upload clock.
    pub async fn record(&self, entry: &AuditEntry, now: DateTime<Utc>) -> Result<(), StoreError> {
        let params = [
            SqlValue::from(entry.group as i32),
            SqlValue::from(upload_clock(now)),
            SqlValue::from(entry.group.level()),
            SqlValue::from(entry.message.as_str()),
            SqlValue::from(entry.endpoint.as_str()),
            SqlValue::from(i32::from(entry.status_code)),
        ];
        self.store.insert(entry.database, INSERT_LOG, &params).await?;
        Ok(())
    }

    /// Like `record`, but a failed insert is only logged.
    pub async fn record_best_effort(&self, entry: &AuditEntry) {
        if let Err(e) = self.record(entry, Utc::now()).await {
            warn!(endpoint = %entry.endpoint, error = %e, "could not persist audit entry");
        }
    }
}
