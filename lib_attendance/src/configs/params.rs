//! # Business Parameters
//!
//! Every tunable of the service (vendor host and credentials, record limits,
//! look-back hours, mail gate) is a row of the parameter table addressed by a
//! numeric group and a description key. Values are read fresh on every use;
//! nothing here caches across calls, so an operator can change a row and the
//! next poll picks it up.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

/// Address of one parameter row: `(id_grupo, prm_descripcion)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamKey {
    /// Numeric parameter group.
    pub group: i32,
    /// Description key inside the group.
    pub name: &'static str,
}

impl ParamKey {
    /// Builds a key; usable in `const` position.
    pub const fn new(group: i32, name: &'static str) -> Self {
        Self { group, name }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.name)
    }
}

/// The parameter rows this service reads.
pub mod keys {
    use super::ParamKey;

    /// DSS server host.
    pub const DSS_HOST: ParamKey = ParamKey::new(1, "host");
    /// DSS server port.
    pub const DSS_PORT: ParamKey = ParamKey::new(1, "port");
    /// DSS user name.
    pub const DSS_USER: ParamKey = ParamKey::new(1, "user");
    /// DSS password.
    pub const DSS_PASSWORD: ParamKey = ParamKey::new(1, "password");
    /// Secret mixed into the token rotation signature.
    pub const DSS_ROTATION_SECRET: ParamKey = ParamKey::new(1, "temp");

    /// Path of the paginated access-record endpoint.
    pub const ACCESS_RECORD_ENDPOINT: ParamKey = ParamKey::new(6, "enpoint_access_record");

    /// `'E'` enables outbound alert mail.
    pub const MAIL_ENABLED: ParamKey = ParamKey::new(8, "send_mail");
    /// First hour of the day alerts may be sent.
    pub const MAIL_WINDOW_START: ParamKey = ParamKey::new(8, "start_time_send_mail_range");
    /// Last hour of the day alerts may be sent.
    pub const MAIL_WINDOW_END: ParamKey = ParamKey::new(8, "end_time_send_mail_range");

    /// Initial look-back for the iclock task, in hours.
    pub const LOOKBACK_ICLOCK: ParamKey = ParamKey::new(14, "num_hours_iclock");
    /// Initial look-back for the acc-monitor task, in hours.
    pub const LOOKBACK_ACC_MONITOR: ParamKey = ParamKey::new(14, "num_hours_acc_monitor_log");
    /// Initial look-back for the acc-monitor-sj task, in hours.
    pub const LOOKBACK_ACC_MONITOR_SJ: ParamKey = ParamKey::new(14, "num_hours_sj_acc_monitor_log");
    /// Page size for the iclock task.
    pub const RECORD_LIMIT_ICLOCK: ParamKey = ParamKey::new(14, "record_limit_dss");
    /// Page size for the acc-monitor task.
    pub const RECORD_LIMIT_ACC_MONITOR: ParamKey = ParamKey::new(14, "record_limit_acc_monitor_log");
    /// Page size for the acc-monitor-sj task.
    pub const RECORD_LIMIT_ACC_MONITOR_SJ: ParamKey =
        ParamKey::new(14, "record_limit_sj_acc_monitor_log");
}

/// Errors raised while reading a parameter.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("parameter {0} is not configured")]
    Missing(ParamKey),

    #[error("parameter {key} has invalid value '{value}': {reason}")]
    Invalid {
        key: ParamKey,
        value: String,
        reason: String,
    },

    #[error("parameter source unavailable: {0}")]
    Source(String),
}

/// Anything that can answer `get_param(group, key)`.
#[async_trait]
pub trait ParamSource: Send + Sync {
    /// Returns the raw value of the row, `None` when the row does not exist.
    async fn get_param(&self, key: ParamKey) -> Result<Option<String>, ParamError>;
}

/// # Settings
///
/// Typed reader over a shared `ParamSource`. Cheap to clone; every accessor
/// goes back to the source.
#[derive(Clone)]
pub struct Settings {
    source: Arc<dyn ParamSource>,
}

impl Settings {
    pub fn new(source: Arc<dyn ParamSource>) -> Self {
        Self { source }
    }

    /// Reads a required, non-empty text parameter (whitespace trimmed).
    pub async fn text(&self, key: ParamKey) -> Result<String, ParamError> {
        match self.source.get_param(key).await? {
            Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            _ => Err(ParamError::Missing(key)),
        }
    }

    /// Reads a required parameter and parses it with `FromStr`.
    pub async fn parse<T>(&self, key: ParamKey) -> Result<T, ParamError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.text(key).await?;
        raw.parse::<T>().map_err(|e| ParamError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        })
    }

    /// Reads an optional text parameter; a missing row is `Ok(None)`.
    pub async fn optional(&self, key: ParamKey) -> Result<Option<String>, ParamError> {
        Ok(self
            .source
            .get_param(key)
            .await?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }
}

/// In-process parameter source backed by a map. Used when the parameter
/// table is not reachable (tests, local runs).
#[derive(Debug, Default)]
pub struct StaticParams {
    values: RwLock<HashMap<ParamKey, String>>,
}

impl StaticParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(self, key: ParamKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Inserts or replaces a value.
    pub fn set(&self, key: ParamKey, value: impl Into<String>) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key, value.into());
        }
    }

    /// Removes a value.
    pub fn remove(&self, key: ParamKey) {
        if let Ok(mut values) = self.values.write() {
            values.remove(&key);
        }
    }
}

#[async_trait]
impl ParamSource for StaticParams {
    async fn get_param(&self, key: ParamKey) -> Result<Option<String>, ParamError> {
        let values = self
            .values
            .read()
            .map_err(|e| ParamError::Source(e.to_string()))?;
        Ok(values.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(params: StaticParams) -> (Arc<StaticParams>, Settings) {
        let params = Arc::new(params);
        (params.clone(), Settings::new(params))
    }

    #[tokio::test]
    async fn test_text_trims_and_rejects_blank() {
        let (_, settings) = settings(
            StaticParams::new()
                .with(keys::DSS_HOST, "  10.0.0.5 ")
                .with(keys::DSS_PORT, "   "),
        );

        assert_eq!(settings.text(keys::DSS_HOST).await.unwrap(), "10.0.0.5");
        assert!(matches!(
            settings.text(keys::DSS_PORT).await,
            Err(ParamError::Missing(k)) if k == keys::DSS_PORT
        ));
        assert!(settings.optional(keys::DSS_PORT).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_parse_reports_invalid_value() {
        let (_, settings) = settings(StaticParams::new().with(keys::RECORD_LIMIT_ICLOCK, "lots"));

        let err = settings
            .parse::<u32>(keys::RECORD_LIMIT_ICLOCK)
            .await
            .unwrap_err();
        assert!(matches!(err, ParamError::Invalid { ref value, .. } if value == "lots"));
    }

    #[tokio::test]
    async fn test_values_are_read_fresh() {
        let (params, settings) = settings(StaticParams::new().with(keys::RECORD_LIMIT_ICLOCK, "50"));
        assert_eq!(settings.parse::<u32>(keys::RECORD_LIMIT_ICLOCK).await.unwrap(), 50);

        params.set(keys::RECORD_LIMIT_ICLOCK, "75");
        assert_eq!(settings.parse::<u32>(keys::RECORD_LIMIT_ICLOCK).await.unwrap(), 75);

        params.remove(keys::RECORD_LIMIT_ICLOCK);
        assert!(settings.parse::<u32>(keys::RECORD_LIMIT_ICLOCK).await.is_err());
    }
}
