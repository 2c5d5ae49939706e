//! # DSS Access-Control Client
//!
//! Everything that talks to the Dahua DSS server: the challenge-response
//! signatures, the raw API calls, the shared session that owns the bearer
//! token, and the access-record fetcher with its response normalization.

/// MD5 signature chains for login and token rotation.
pub mod signature;

/// Raw vendor endpoints behind the `VendorApi` trait.
pub mod api;

/// Token lifecycle: authentication, liveness probe, rotation.
pub mod session;

/// Fetch windows, access events and local-time normalization.
pub mod model;

/// Paginated access-record retrieval.
pub mod fetcher;

pub use api::{AuthorizeRequest, Challenge, DssApi, Grant, VendorApi, VendorError};
pub use fetcher::{FetchError, RecordFetcher};
pub use model::{normalize_envelope, AccessEvent, AccessPage, FetchWindow};
pub use session::{AuthError, SessionManager};
