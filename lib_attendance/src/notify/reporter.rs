//! Failure fan-out: log line, gated alert and `logs_info` row.

use std::sync::Arc;

use chrono::Utc;
use tracing::error;

use super::gated::Notifier;
use crate::connections::{AuditEntry, AuditLog, Database};

/// A failure worth an operator's attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Database whose audit log receives the entry.
    pub database: Database,
    /// Component tag, e.g. `fetch_iclock` or `migrate_acc_monitor`.
    pub endpoint: String,
    pub status: u16,
    pub message: String,
}

impl Failure {
    pub fn new(
        database: Database,
        endpoint: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self {
            database,
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    /// Alert body: database, component tag and status ahead of the message.
    pub fn alert_text(&self) -> String {
        format!(
            "[{}] {} (status {}): {}",
            self.database, self.endpoint, self.status, self.message
        )
    }
}

#[derive(Clone)]
pub struct FailureReporter {
    notifier: Arc<dyn Notifier>,
    audit: AuditLog,
}

impl FailureReporter {
    pub fn new(notifier: Arc<dyn Notifier>, audit: AuditLog) -> Self {
        Self { notifier, audit }
    }

    /// Never fails: a broken audit insert is logged and dropped.
    pub async fn report(&self, failure: &Failure) {
        error!(
            database = %failure.database,
            endpoint = %failure.endpoint,
            status = failure.status,
            "{}",
            failure.message
        );
        self.notifier.notify(&failure.alert_text()).await;

        let entry = AuditEntry::error(
            failure.database,
            failure.message.clone(),
            failure.endpoint.clone(),
            failure.status,
        );
        if let Err(e) = self.audit.record(&entry, Utc::now()).await {
            error!(error = %e, "could not persist failure to the audit log");
        }
    }
}
