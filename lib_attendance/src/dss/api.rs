//! # DSS Vendor API
//!
//! The four vendor endpoints the service uses, behind the `VendorApi` trait so
//! the session manager and fetcher can be exercised without a DSS server.
//! `DssApi` is the production implementation; it resolves host and port from
//! the parameter table on every call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use super::model::FetchWindow;
use crate::configs::{keys, ParamError, Settings};
use crate::retrieve::{ApiClient, ApiResponse, ClientOptions, HttpError};

/// Path prefix of the account endpoints.
pub const API_PREFIX: &str = "/brms/api/v1.0";
/// Client type announced in both authorize calls.
pub const CLIENT_TYPE: &str = "WINPC_V2";
/// Header carrying the bearer token.
pub const TOKEN_HEADER: &str = "X-Subject-Token";

/// First authorize response: the challenge material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Challenge {
    #[serde(default)]
    pub realm: Option<String>,
    #[serde(rename = "randomKey", default)]
    pub random_key: Option<String>,
    #[serde(default)]
    pub publickey: Option<String>,
}

/// Second authorize call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    pub user_name: String,
    pub signature: String,
    pub random_key: String,
    pub public_key: String,
    pub encrypt_type: String,
    pub ip_address: String,
    pub client_type: String,
    pub user_type: String,
}

impl AuthorizeRequest {
    pub fn new(user_name: String, signature: String, random_key: String, public_key: String) -> Self {
        Self {
            user_name,
            signature,
            random_key,
            public_key,
            encrypt_type: "MD5".to_string(),
            ip_address: String::new(),
            client_type: CLIENT_TYPE.to_string(),
            user_type: "0".to_string(),
        }
    }
}

/// Second authorize response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Grant {
    #[serde(rename = "accessToken", default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl Grant {
    /// `accessToken`, falling back to `token`.
    pub fn into_token(self) -> Option<String> {
        self.access_token
            .filter(|t| !t.is_empty())
            .or(self.token.filter(|t| !t.is_empty()))
    }
}

#[derive(Debug, Error)]
pub enum VendorError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("vendor answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Params(#[from] ParamError),

    #[error("invalid vendor address: {0}")]
    Address(#[from] url::ParseError),

    #[error("token is not a valid header value: {0}")]
    InvalidToken(String),
}

/// Raw vendor operations.
#[async_trait]
pub trait VendorApi: Send + Sync {
    /// First authorize call: `{userName, clientType}` to challenge material.
    async fn request_challenge(&self, user: &str) -> Result<Challenge, VendorError>;

    /// Second authorize call: signed request to token grant.
    async fn exchange(&self, request: &AuthorizeRequest) -> Result<Grant, VendorError>;

    /// Liveness probe; returns the HTTP status.
    async fn keepalive(&self, token: &str) -> Result<u16, VendorError>;

    /// Token rotation; returns `data.token` of the response.
    async fn update_token(&self, token: &str, signature: &str) -> Result<Option<String>, VendorError>;

    /// One page of access records, as the raw JSON envelope.
    async fn query_access_records(&self, token: &str, window: &FetchWindow)
        -> Result<Value, VendorError>;
}

/// `VendorApi` over HTTPS against the configured DSS server.
pub struct DssApi {
    http: ApiClient,
    settings: Settings,
}

impl DssApi {
    /// The DSS server runs with a self-signed certificate, so the client
    /// skips certificate validation.
    pub fn new(settings: Settings, timeout: Duration) -> Result<Self, VendorError> {
        let http = ApiClient::new(&ClientOptions {
            timeout,
            accept_invalid_certs: true,
            ..ClientOptions::default()
        })?;
        Ok(Self { http, settings })
    }

    /// `https://{host}:{port}` from the parameter table.
    async fn origin(&self) -> Result<Url, VendorError> {
        let host = self.settings.text(keys::DSS_HOST).await?;
        let port = self.settings.parse::<u16>(keys::DSS_PORT).await?;
        Ok(Url::parse(&format!("https://{host}:{port}"))?)
    }

    async fn account_url(&self, path: &str) -> Result<Url, VendorError> {
        Ok(self.origin().await?.join(&format!("{API_PREFIX}{path}"))?)
    }

    fn token_headers(token: &str) -> Result<HeaderMap, VendorError> {
        let mut headers = HeaderMap::new();
        let value =
            HeaderValue::from_str(token).map_err(|e| VendorError::InvalidToken(e.to_string()))?;
        headers.insert(TOKEN_HEADER, value);
        Ok(headers)
    }
}

/// The authorize endpoint answers the challenge with 401 and a JSON body,
/// so both success and error bodies are accepted as long as they parse.
fn body_or_status<T: DeserializeOwned>(resp: ApiResponse<Value>) -> Result<T, VendorError> {
    let value = match (resp.data, resp.error_body.as_deref()) {
        (Some(value), _) => value,
        (None, Some(body)) => serde_json::from_str(body).unwrap_or(Value::Null),
        (None, None) => Value::Null,
    };
    if !value.is_object() {
        return Err(VendorError::Status {
            status: resp.status,
            body: resp.error_body.unwrap_or_default(),
        });
    }
    serde_json::from_value(value).map_err(|e| VendorError::Status {
        status: resp.status,
        body: e.to_string(),
    })
}

#[async_trait]
impl VendorApi for DssApi {
    async fn request_challenge(&self, user: &str) -> Result<Challenge, VendorError> {
        let url = self.account_url("/accounts/authorize").await?;
        let body = json!({ "userName": user, "clientType": CLIENT_TYPE });
        let resp = self.http.request::<Value, _>(Method::POST, url, None, Some(&body)).await?;
        body_or_status(resp)
    }

    async fn exchange(&self, request: &AuthorizeRequest) -> Result<Grant, VendorError> {
        let url = self.account_url("/accounts/authorize").await?;
        let resp = self.http.request::<Value, _>(Method::POST, url, None, Some(request)).await?;
        body_or_status(resp)
    }

    async fn keepalive(&self, token: &str) -> Result<u16, VendorError> {
        let url = self.account_url("/accounts/keepalive").await?;
        let headers = Self::token_headers(token)?;
        let resp = self
            .http
            .request::<Value, _>(Method::PUT, url, Some(headers), Some(&json!({})))
            .await?;
        Ok(resp.status)
    }

    async fn update_token(&self, token: &str, signature: &str) -> Result<Option<String>, VendorError> {
        let url = self.account_url("/accounts/updateToken").await?;
        let headers = Self::token_headers(token)?;
        let body = json!({ "signature": signature });
        let resp = self
            .http
            .request::<Value, _>(Method::POST, url, Some(headers), Some(&body))
            .await?;

        if resp.status != 200 {
            return Err(VendorError::Status {
                status: resp.status,
                body: resp.error_body.unwrap_or_default(),
            });
        }
        Ok(resp
            .data
            .as_ref()
            .and_then(|v| v.pointer("/data/token"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string))
    }

    async fn query_access_records(
        &self,
        token: &str,
        window: &FetchWindow,
    ) -> Result<Value, VendorError> {
        let endpoint = self.settings.text(keys::ACCESS_RECORD_ENDPOINT).await?;
        let url = self.origin().await?.join(&endpoint)?;

        let mut headers = Self::token_headers(token)?;
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json;charset=UTF-8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en"));

        let resp = self
            .http
            .request::<Value, _>(Method::POST, url, Some(headers), Some(window))
            .await?;

        if resp.status != 200 {
            return Err(VendorError::Status {
                status: resp.status,
                body: resp.error_body.unwrap_or_default(),
            });
        }
        Ok(resp.data.unwrap_or(Value::Null))
    }
}
