//! In-memory fakes shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::{json, Value};

use crate::configs::{keys, Settings, StaticParams};
use crate::connections::{Database, RelationalStore, SqlRow, SqlValue, StoreError};
use crate::dss::{AccessEvent, AuthorizeRequest, Challenge, FetchWindow, Grant, VendorApi, VendorError};
use crate::migration::{Employee, IclockRow, MonitorLogRow, TargetStore, TargetTable};
use crate::notify::{AlertError, AlertTransport, Notifier};

/// Parameters of a fully configured deployment.
pub fn test_settings() -> Settings {
    let params = StaticParams::new()
        .with(keys::DSS_HOST, "dss.local")
        .with(keys::DSS_PORT, "443")
        .with(keys::DSS_USER, "system")
        .with(keys::DSS_PASSWORD, "secret")
        .with(keys::DSS_ROTATION_SECRET, "rotation-secret")
        .with(keys::ACCESS_RECORD_ENDPOINT, "/obms/api/v1.1/acs/access/record/fetch/page")
        .with(keys::MAIL_ENABLED, "E")
        .with(keys::MAIL_WINDOW_START, "0")
        .with(keys::MAIL_WINDOW_END, "23")
        .with(keys::LOOKBACK_ICLOCK, "2")
        .with(keys::LOOKBACK_ACC_MONITOR, "2")
        .with(keys::LOOKBACK_ACC_MONITOR_SJ, "2")
        .with(keys::RECORD_LIMIT_ICLOCK, "500")
        .with(keys::RECORD_LIMIT_ACC_MONITOR, "500")
        .with(keys::RECORD_LIMIT_ACC_MONITOR_SJ, "500");
    Settings::new(Arc::new(params))
}

/// A normalized event with a local alarm time.
pub fn event(pin: &str, point: &str, alarm_time: &str) -> AccessEvent {
    AccessEvent {
        person_id: Some(pin.to_string()),
        point_name: Some(point.to_string()),
        first_name: None,
        alarm_time: Some(alarm_time.to_string()),
        alarm_epoch: None,
    }
}

// --- Vendor ---

#[derive(Default)]
struct VendorState {
    challenge_calls: usize,
    exchange_calls: usize,
    keepalive_calls: usize,
    rotation_calls: usize,
    query_calls: usize,
    keepalive_status: Option<u16>,
    drop_realm: bool,
    fail_rotation: bool,
    fail_queries: Option<u16>,
    pages: VecDeque<Value>,
    last_exchange: Option<AuthorizeRequest>,
    last_rotation_signature: Option<String>,
    last_query_token: Option<String>,
    last_window: Option<FetchWindow>,
}

/// Scripted DSS server. Tokens are numbered by exchange (`token-1`, ...).
#[derive(Default)]
pub struct MockVendor {
    state: Mutex<VendorState>,
}

impl MockVendor {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut VendorState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn challenge_calls(&self) -> usize {
        self.with(|s| s.challenge_calls)
    }

    pub fn exchange_calls(&self) -> usize {
        self.with(|s| s.exchange_calls)
    }

    pub fn keepalive_calls(&self) -> usize {
        self.with(|s| s.keepalive_calls)
    }

    pub fn rotation_calls(&self) -> usize {
        self.with(|s| s.rotation_calls)
    }

    pub fn query_calls(&self) -> usize {
        self.with(|s| s.query_calls)
    }

    pub fn set_keepalive_status(&self, status: u16) {
        self.with(|s| s.keepalive_status = Some(status));
    }

    /// Challenges come back without a realm.
    pub fn drop_realm(&self) {
        self.with(|s| s.drop_realm = true);
    }

    pub fn fail_rotation(&self) {
        self.with(|s| s.fail_rotation = true);
    }

    /// Every record query answers `status`.
    pub fn fail_queries(&self, status: u16) {
        self.with(|s| s.fail_queries = Some(status));
    }

    /// Queues the envelope returned by the next record query.
    pub fn push_page(&self, page: Value) {
        self.with(|s| s.pages.push_back(page));
    }

    pub fn last_exchange(&self) -> Option<AuthorizeRequest> {
        self.with(|s| s.last_exchange.clone())
    }

    pub fn last_rotation_signature(&self) -> Option<String> {
        self.with(|s| s.last_rotation_signature.clone())
    }

    pub fn last_query_token(&self) -> Option<String> {
        self.with(|s| s.last_query_token.clone())
    }

    pub fn last_window(&self) -> Option<FetchWindow> {
        self.with(|s| s.last_window)
    }
}

#[async_trait]
impl VendorApi for MockVendor {
    async fn request_challenge(&self, _user: &str) -> Result<Challenge, VendorError> {
        Ok(self.with(|s| {
            s.challenge_calls += 1;
            let n = s.challenge_calls;
            Challenge {
                realm: (!s.drop_realm).then(|| "DSS-realm".to_string()),
                random_key: Some(format!("rk-{n}")),
                publickey: Some(format!("pk-{n}")),
            }
        }))
    }

    async fn exchange(&self, request: &AuthorizeRequest) -> Result<Grant, VendorError> {
        Ok(self.with(|s| {
            s.exchange_calls += 1;
            s.last_exchange = Some(request.clone());
            Grant {
                access_token: Some(format!("token-{}", s.exchange_calls)),
                token: None,
            }
        }))
    }

    async fn keepalive(&self, _token: &str) -> Result<u16, VendorError> {
        Ok(self.with(|s| {
            s.keepalive_calls += 1;
            s.keepalive_status.unwrap_or(200)
        }))
    }

    async fn update_token(&self, _token: &str, signature: &str) -> Result<Option<String>, VendorError> {
        self.with(|s| {
            s.rotation_calls += 1;
            s.last_rotation_signature = Some(signature.to_string());
            if s.fail_rotation {
                return Err(VendorError::Status {
                    status: 500,
                    body: "rotation refused".into(),
                });
            }
            Ok(Some(format!("rotated-{}", s.rotation_calls)))
        })
    }

    async fn query_access_records(&self, token: &str, window: &FetchWindow) -> Result<Value, VendorError> {
        self.with(|s| {
            s.query_calls += 1;
            s.last_query_token = Some(token.to_string());
            s.last_window = Some(*window);
            if let Some(status) = s.fail_queries {
                return Err(VendorError::Status {
                    status,
                    body: "unavailable".into(),
                });
            }
            Ok(s.pages.pop_front().unwrap_or_else(|| json!({"data": null})))
        })
    }
}

// --- Relational store ---

#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    pub db: Database,
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Records every statement; selects answer from a queue (empty queue: no row).
#[derive(Default)]
pub struct RecordingStore {
    calls: Mutex<Vec<StoreCall>>,
    selects: Mutex<VecDeque<Option<SqlRow>>>,
    fail_writes: Mutex<bool>,
}

impl RecordingStore {
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn push_select(&self, row: Option<SqlRow>) {
        self.selects.lock().unwrap().push_back(row);
    }

    /// Inserts and updates are still recorded, then fail.
    pub fn fail_writes(&self) {
        *self.fail_writes.lock().unwrap() = true;
    }

    fn record(&self, db: Database, sql: &str, params: &[SqlValue]) {
        self.calls.lock().unwrap().push(StoreCall {
            db,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }

    fn write(&self, db: Database, sql: &str, params: &[SqlValue]) -> Result<u64, StoreError> {
        self.record(db, sql, params);
        if *self.fail_writes.lock().unwrap() {
            return Err(StoreError::Query {
                db,
                message: "write refused".into(),
            });
        }
        Ok(1)
    }
}

#[async_trait]
impl RelationalStore for RecordingStore {
    async fn select_one(&self, db: Database, sql: &str, params: &[SqlValue]) -> Result<Option<SqlRow>, StoreError> {
        self.record(db, sql, params);
        Ok(self.selects.lock().unwrap().pop_front().flatten())
    }

    async fn select_many(&self, db: Database, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, StoreError> {
        self.record(db, sql, params);
        Ok(self.selects.lock().unwrap().pop_front().flatten().into_iter().collect())
    }

    async fn insert(&self, db: Database, sql: &str, params: &[SqlValue]) -> Result<u64, StoreError> {
        self.write(db, sql, params)
    }

    async fn update(&self, db: Database, sql: &str, params: &[SqlValue]) -> Result<u64, StoreError> {
        self.write(db, sql, params)
    }
}

// --- Destination tables ---

#[derive(Default)]
struct Tables {
    iclock: Vec<IclockRow>,
    monitor: Vec<MonitorLogRow>,
    employees: HashMap<String, Option<String>>,
    renames: Vec<(String, String)>,
    failing_pins: HashSet<String>,
}

impl Tables {
    fn keys(&self, table: TargetTable) -> Vec<(NaiveDateTime, &str)> {
        match table {
            TargetTable::Iclock => self
                .iclock
                .iter()
                .map(|r| (r.punch_time, r.emp_code.as_str()))
                .collect(),
            other => self
                .monitor
                .iter()
                .filter(|r| r.target.table == other)
                .map(|r| (r.time, r.pin.as_str()))
                .collect(),
        }
    }
}

/// `TargetStore` over plain vectors.
#[derive(Default)]
pub struct MemoryTargetStore {
    tables: Mutex<Tables>,
}

impl MemoryTargetStore {
    pub fn iclock_rows(&self) -> Vec<IclockRow> {
        self.tables.lock().unwrap().iclock.clone()
    }

    pub fn monitor_rows(&self) -> Vec<MonitorLogRow> {
        self.tables.lock().unwrap().monitor.clone()
    }

    pub fn add_employee(&self, emp_code: &str, first_name: Option<&str>) {
        self.tables
            .lock()
            .unwrap()
            .employees
            .insert(emp_code.to_string(), first_name.map(str::to_string));
    }

    pub fn renames(&self) -> Vec<(String, String)> {
        self.tables.lock().unwrap().renames.clone()
    }

    /// Inserts for `pin` fail.
    pub fn fail_inserts_for(&self, pin: &str) {
        self.tables.lock().unwrap().failing_pins.insert(pin.to_string());
    }

    fn check(tables: &Tables, db: Database, pin: &str) -> Result<(), StoreError> {
        if tables.failing_pins.contains(pin) {
            return Err(StoreError::Query {
                db,
                message: format!("insert for {pin} refused"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TargetStore for MemoryTargetStore {
    async fn exists(&self, table: TargetTable, time: NaiveDateTime, pin: &str) -> Result<bool, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.keys(table).iter().any(|(t, p)| *t == time && *p == pin))
    }

    async fn last_time(&self, table: TargetTable, pin: &str) -> Result<Option<NaiveDateTime>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .keys(table)
            .iter()
            .filter(|(_, p)| *p == pin)
            .map(|(t, _)| *t)
            .max())
    }

    async fn insert_iclock(&self, row: &IclockRow) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap();
        Self::check(&tables, TargetTable::Iclock.database(), &row.emp_code)?;
        tables.iclock.push(row.clone());
        Ok(())
    }

    async fn insert_monitor(&self, row: &MonitorLogRow) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap();
        Self::check(&tables, row.target.table.database(), &row.pin)?;
        tables.monitor.push(row.clone());
        Ok(())
    }

    async fn find_employee(&self, emp_code: &str) -> Result<Option<Employee>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.employees.get(emp_code).map(|first_name| Employee {
            emp_code: emp_code.to_string(),
            first_name: first_name.clone(),
        }))
    }

    async fn rename_employee(&self, emp_code: &str, first_name: &str) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(slot) = tables.employees.get_mut(emp_code) else {
            return Ok(0);
        };
        *slot = Some(first_name.to_string());
        tables
            .renames
            .push((emp_code.to_string(), first_name.to_string()));
        Ok(1)
    }
}

// --- Alerts ---

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub struct RecordingTransport {
    messages: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertTransport for RecordingTransport {
    async fn deliver(&self, _subject: &str, body: &str) -> Result<(), AlertError> {
        self.messages.lock().unwrap().push(body.to_string());
        Ok(())
    }
}
