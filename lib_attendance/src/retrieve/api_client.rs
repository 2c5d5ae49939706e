//! # HTTP Retrieval Utilities
//!
//! An asynchronous API client wrapper around `reqwest` with middleware for
//! exponential backoff retries on transient failures.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// A standardized container for API responses.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The deserialized response body. `None` on failure or empty body.
    pub data: Option<T>,
    /// The raw body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
}

/// Errors that prevent a response from being produced at all.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("response with status {status} is not valid JSON: {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
}

/// Tunables for one client instance.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries on transient failures (connect errors, 5xx, 429).
    pub max_retries: u32,
    /// Skips certificate validation; only for servers with self-signed certs.
    pub accept_invalid_certs: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            accept_invalid_certs: false,
        }
    }
}

/// A flexible asynchronous HTTP client built on `reqwest_middleware`.
#[derive(Clone)]
pub struct ApiClient {
    inner: ClientWithMiddleware,
}

impl ApiClient {
    /// Creates a client with an exponential backoff retry policy.
    pub fn new(options: &ClientOptions) -> Result<Self, HttpError> {
        let base = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()
            .map_err(HttpError::Build)?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(options.max_retries);
        let client = ClientBuilder::new(base)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { inner: client })
    }

    /// Performs an HTTP request against an absolute URL.
    ///
    /// A JSON body gets `Content-Type: application/json` unless `headers`
    /// already carries a content type. Non-2xx statuses are not errors: they
    /// come back with `success == false` and the raw body in `error_body`.
    pub async fn request<T, B>(
        &self,
        method: Method,
        url: Url,
        headers: Option<HeaderMap>,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, HttpError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut headers = headers.unwrap_or_default();
        let mut req = self.inner.request(method, url);

        if let Some(b) = body {
            let json_body = serde_json::to_string(b).map_err(HttpError::Serialize)?;
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            req = req.body(json_body);
        }
        req = req.headers(headers);

        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await.map_err(HttpError::Body)?;

        if !status.is_success() {
            return Ok(ApiResponse {
                data: None,
                error_body: Some(text),
                status: status.as_u16(),
                success: false,
            });
        }

        let data = if text.trim().is_empty() {
            None
        } else {
            let parsed = serde_json::from_str::<T>(&text).map_err(|source| HttpError::Decode {
                status: status.as_u16(),
                source,
            })?;
            Some(parsed)
        };

        Ok(ApiResponse {
            data,
            error_body: None,
            status: status.as_u16(),
            success: true,
        })
    }
}
