//! # Data Retrieval Module
//!
//! Generic HTTP plumbing shared by the vendor API client: request building,
//! retries with exponential backoff and standardized JSON response handling.
//! Vendor-specific knowledge (paths, headers, auth) lives in `crate::dss`.

/// HTTP API client with retry middleware.
pub mod api_client;

pub use api_client::{ApiClient, ApiResponse, ClientOptions, HttpError};
