//! # Access-Record Model
//!
//! The vendor answers the paginated query with an envelope
//! `{"data": {"pageData": [...]}}` whose records carry `alarmTime` in UTC
//! (epoch seconds, as number or string, or a datetime string). Everything
//! downstream works in business local time, so records are rewritten to
//! `%Y-%m-%d %H:%M:%S` in `America/Guayaquil` right after retrieval.

use std::fmt::Display;

use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

/// Business time zone (UTC-5, no daylight saving).
pub const BUSINESS_TZ: Tz = chrono_tz::America::Guayaquil;

/// Format of every local datetime string handled by the service.
pub const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Query body for one page: all values travel as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchWindow {
    #[serde(serialize_with = "as_string")]
    pub page: u32,
    #[serde(serialize_with = "as_string")]
    pub page_size: u32,
    /// Inclusive lower bound, epoch seconds.
    #[serde(serialize_with = "as_string")]
    pub start_time: i64,
    /// Upper bound, epoch seconds.
    #[serde(serialize_with = "as_string")]
    pub end_time: i64,
}

impl FetchWindow {
    /// First page of `[start_time, end_time]`.
    pub fn first_page(start_time: i64, end_time: i64, page_size: u32) -> Self {
        Self {
            page: 1,
            page_size,
            start_time,
            end_time,
        }
    }
}

fn as_string<S: Serializer, T: Display>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// One access event as delivered by the vendor, after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    /// Employee code; events without one cannot be migrated.
    #[serde(rename = "personId", default, deserialize_with = "lenient_string")]
    pub person_id: Option<String>,
    /// Door name, the key into the door catalog.
    #[serde(rename = "pointName", default, deserialize_with = "lenient_string")]
    pub point_name: Option<String>,
    #[serde(rename = "firstName", default, deserialize_with = "lenient_string")]
    pub first_name: Option<String>,
    /// Local datetime string (`LOCAL_FORMAT`).
    #[serde(rename = "alarmTime", default, deserialize_with = "lenient_string")]
    pub alarm_time: Option<String>,
    /// Absolute time of the event, used for watermarks.
    #[serde(skip)]
    pub alarm_epoch: Option<i64>,
}

impl AccessEvent {
    /// Parses `alarm_time` back into a naive local datetime.
    pub fn local_time(&self) -> Option<NaiveDateTime> {
        let raw = self.alarm_time.as_deref()?;
        NaiveDateTime::parse_from_str(raw.trim(), LOCAL_FORMAT).ok()
    }

    /// `point_name` with an empty string for missing doors.
    pub fn point(&self) -> &str {
        self.point_name.as_deref().unwrap_or("")
    }
}

/// Accepts strings and numbers; anything else (or blank) becomes `None`.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    let text = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Ok(None),
    };
    Ok(Some(text).filter(|s| !s.is_empty()))
}

/// One normalized page of access events, in vendor order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPage {
    pub page_data: Vec<AccessEvent>,
}

impl AccessPage {
    /// Builds a page from a raw vendor envelope, converting alarm times.
    /// Records that cannot be decoded are logged and dropped.
    pub fn from_envelope(raw: Value) -> Self {
        let mut raw = raw;
        let records = match raw.get_mut("data").and_then(|d| d.get_mut("pageData")) {
            Some(Value::Array(items)) => std::mem::take(items),
            _ => Vec::new(),
        };

        let mut page_data = Vec::with_capacity(records.len());
        for mut record in records {
            let epoch = normalize_record(&mut record);
            match serde_json::from_value::<AccessEvent>(record) {
                Ok(mut event) => {
                    event.alarm_epoch = epoch;
                    page_data.push(event);
                }
                Err(e) => warn!(error = %e, "dropping undecodable access record"),
            }
        }
        Self { page_data }
    }

    pub fn is_empty(&self) -> bool {
        self.page_data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.page_data.len()
    }

    /// Latest absolute event time on the page.
    pub fn max_epoch(&self) -> Option<i64> {
        self.page_data.iter().filter_map(|e| e.alarm_epoch).max()
    }
}

/// Guarantees `data.pageData` is an array and rewrites every record's
/// `alarmTime` to business local time.
pub fn normalize_envelope(raw: Value) -> Value {
    let mut envelope = match raw {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let data = envelope
        .entry("data")
        .or_insert_with(|| Value::Object(Map::new()));
    if !data.is_object() {
        *data = Value::Object(Map::new());
    }

    if let Some(data) = data.as_object_mut() {
        let page = data.entry("pageData").or_insert_with(|| Value::Array(Vec::new()));
        if !page.is_array() {
            *page = Value::Array(Vec::new());
        }
        if let Some(records) = page.as_array_mut() {
            for record in records.iter_mut() {
                normalize_record(record);
            }
        }
    }

    Value::Object(envelope)
}

/// Rewrites `alarmTime` in place and returns its absolute epoch. Values that
/// do not parse are left untouched.
fn normalize_record(record: &mut Value) -> Option<i64> {
    let slot = record.as_object_mut()?.get_mut("alarmTime")?;
    let epoch = alarm_epoch(slot)?;
    let local = to_local_string(epoch)?;
    *slot = Value::String(local);
    Some(epoch)
}

/// Reads a UTC alarm time: epoch seconds (number or digits) or a datetime
/// string.
pub fn alarm_epoch(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(secs) = s.parse::<i64>() {
                return Some(secs);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.timestamp());
            }
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|n| n.and_utc().timestamp())
        }
        _ => None,
    }
}

/// Formats an epoch in business local time.
pub fn to_local_string(epoch: i64) -> Option<String> {
    let utc = DateTime::from_timestamp(epoch, 0)?;
    Some(utc.with_timezone(&BUSINESS_TZ).format(LOCAL_FORMAT).to_string())
}
