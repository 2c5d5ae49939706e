//! # Record Fetcher
//!
//! One call per page of the vendor's paginated access-record query. Obtains a
//! token from the session when the caller does not pass one.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::api::{VendorApi, VendorError};
use super::model::{normalize_envelope, AccessPage, FetchWindow};
use super::session::{AuthError, SessionManager};
use crate::configs::ParamError;
use crate::retrieve::HttpError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no session token: {0}")]
    Auth(#[from] AuthError),

    #[error("record endpoint not configured: {0}")]
    Config(#[source] ParamError),

    #[error("record query failed (status {status:?}): {message}")]
    Transport { status: Option<u16>, message: String },

    #[error("record response could not be parsed: {0}")]
    Parse(String),
}

impl FetchError {
    /// HTTP status the vendor answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<VendorError> for FetchError {
    fn from(e: VendorError) -> Self {
        match e {
            VendorError::Status { status, body } => FetchError::Transport {
                status: Some(status),
                message: body,
            },
            VendorError::Params(p) => FetchError::Config(p),
            VendorError::Http(HttpError::Decode { source, .. }) => FetchError::Parse(source.to_string()),
            other => FetchError::Transport {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

/// Paginated access-record retrieval.
pub struct RecordFetcher {
    api: Arc<dyn VendorApi>,
    session: Arc<SessionManager>,
}

impl RecordFetcher {
    pub fn new(api: Arc<dyn VendorApi>, session: Arc<SessionManager>) -> Self {
        Self { api, session }
    }

    async fn query(&self, window: &FetchWindow, token: Option<String>) -> Result<Value, FetchError> {
        let token = match token {
            Some(token) => token,
            None => self.session.get_token().await?,
        };
        debug!(
            page = window.page,
            page_size = window.page_size,
            start = window.start_time,
            end = window.end_time,
            "querying access records"
        );
        Ok(self.api.query_access_records(&token, window).await?)
    }

    /// One page as typed events, alarm times in local business time.
    pub async fn fetch_page(
        &self,
        window: &FetchWindow,
        token: Option<String>,
    ) -> Result<AccessPage, FetchError> {
        let raw = self.query(window, token).await?;
        Ok(AccessPage::from_envelope(raw))
    }

    /// One page as the normalized vendor envelope.
    pub async fn fetch_raw_page(
        &self,
        window: &FetchWindow,
        token: Option<String>,
    ) -> Result<Value, FetchError> {
        let raw = self.query(window, token).await?;
        Ok(normalize_envelope(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_settings, MockVendor};
    use serde_json::json;

    fn fetcher(vendor: &Arc<MockVendor>) -> RecordFetcher {
        let session = Arc::new(SessionManager::new(vendor.clone(), test_settings()));
        RecordFetcher::new(vendor.clone(), session)
    }

    #[tokio::test]
    async fn test_fetch_acquires_token_and_normalizes() {
        let vendor = Arc::new(MockVendor::new());
        vendor.push_page(json!({"data": {"pageData": [
            {"personId": "1001", "pointName": "B_Ventas_Door1", "alarmTime": 1_740_834_000}
        ]}}));
        let fetcher = fetcher(&vendor);

        let window = FetchWindow::first_page(1_740_800_000, 1_740_900_000, 100);
        let page = fetcher.fetch_page(&window, None).await.unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page.page_data[0].alarm_time.as_deref(), Some("2025-03-01 08:00:00"));
        assert_eq!(vendor.exchange_calls(), 1);
        assert_eq!(vendor.last_query_token().as_deref(), Some("token-1"));
        assert_eq!(vendor.last_window(), Some(window));
    }

    #[tokio::test]
    async fn test_explicit_token_skips_session() {
        let vendor = Arc::new(MockVendor::new());
        let fetcher = fetcher(&vendor);

        let window = FetchWindow::first_page(0, 10, 7000);
        let raw = fetcher
            .fetch_raw_page(&window, Some("given".into()))
            .await
            .unwrap();

        assert_eq!(raw, json!({"data": {"pageData": []}}));
        assert_eq!(vendor.exchange_calls(), 0);
        assert_eq!(vendor.last_query_token().as_deref(), Some("given"));
    }

    #[tokio::test]
    async fn test_vendor_status_becomes_transport_error() {
        let vendor = Arc::new(MockVendor::new());
        vendor.fail_queries(503);
        let fetcher = fetcher(&vendor);

        let err = fetcher
            .fetch_page(&FetchWindow::first_page(0, 10, 1), Some("t".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_login_failure_is_auth_error() {
        let vendor = Arc::new(MockVendor::new());
        vendor.drop_realm();
        let fetcher = fetcher(&vendor);

        let err = fetcher
            .fetch_page(&FetchWindow::first_page(0, 10, 1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Auth(_)));
        assert_eq!(vendor.query_calls(), 0);
    }
}
