//! On-demand read of the last seven days of access records.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{error, info};

use crate::connections::{AuditEntry, AuditLog, Database};
use crate::dss::{FetchError, FetchWindow, RecordFetcher};

pub const BACKFILL_DAYS: i64 = 7;
pub const BACKFILL_LEAD_HOURS: i64 = 1;
pub const BACKFILL_PAGE_SIZE: u32 = 7000;

/// Component tag of backfill failures in the audit log.
pub const BACKFILL_ENDPOINT: &str = "get_data_for_a_week";

/// Read-only passthrough: nothing fetched here is migrated or advances a
/// watermark.
#[derive(Clone)]
pub struct WeeklyBackfill {
    fetcher: Arc<RecordFetcher>,
    audit: AuditLog,
}

impl WeeklyBackfill {
    pub fn new(fetcher: Arc<RecordFetcher>, audit: AuditLog) -> Self {
        Self { fetcher, audit }
    }

    /// `[now - 7d, now + 1h]`, first page.
    pub fn window(now: DateTime<Utc>) -> FetchWindow {
        FetchWindow::first_page(
            (now - Duration::days(BACKFILL_DAYS)).timestamp(),
            (now + Duration::hours(BACKFILL_LEAD_HOURS)).timestamp(),
            BACKFILL_PAGE_SIZE,
        )
    }

    /// Normalized vendor envelope for the window ending at `now`.
    pub async fn fetch_week(&self, now: DateTime<Utc>) -> Result<Value, FetchError> {
        let window = Self::window(now);
        match self.fetcher.fetch_raw_page(&window, None).await {
            Ok(envelope) => {
                info!(start = window.start_time, end = window.end_time, "weekly records fetched");
                Ok(envelope)
            }
            Err(e) => {
                let message = format!("error fetching attendance records: {e}");
                error!("{message}");
                let entry = AuditEntry::error(Database::Control, message, BACKFILL_ENDPOINT, 404);
                self.audit.record_best_effort(&entry).await;
                Err(e)
            }
        }
    }
}
