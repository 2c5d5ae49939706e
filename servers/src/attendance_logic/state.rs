use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lib_attendance::dss::FetchError;
use lib_attendance::ingestors::WeeklyBackfill;
use serde_json::Value;

/// Source of the seven-day record dump served over HTTP.
#[async_trait]
pub trait WeekSource: Send + Sync {
    async fn fetch_week(&self, now: DateTime<Utc>) -> Result<Value, FetchError>;
}

#[async_trait]
impl WeekSource for WeeklyBackfill {
    async fn fetch_week(&self, now: DateTime<Utc>) -> Result<Value, FetchError> {
        WeeklyBackfill::fetch_week(self, now).await
    }
}

#[derive(Clone)]
pub struct AppState {
    pub week: Arc<dyn WeekSource>,
}

impl AppState {
    pub fn new(week: Arc<dyn WeekSource>) -> Self {
        Self { week }
    }
}
