//! # Destination Rows
//!
//! Column layouts of `iclock_transaction` and the two dining-room monitor
//! logs. Constant columns are fixed business values expected by the
//! attendance software reading these tables.

use chrono::{NaiveDate, NaiveDateTime};

use super::catalog::DoorAttributes;
use super::target::TargetTable;
use crate::connections::SqlValue;

/// Column list of `iclock_transaction`, in bind order.
pub const ICLOCK_COLUMNS: &str = "emp_code, punch_time, punch_state, verify_type, work_code, \
     terminal_sn, terminal_alias, area_alias, source, purpose, crc, upload_time, emp_id, \
     terminal_id, is_mask, temperature, fecha_bio";

/// Column list of the monitor logs, in bind order.
pub const MONITOR_COLUMNS: &str = "status, \"time\", pin, device_id, device_name, verified, state, \
     event_type, event_point_type, event_point_id, event_point_name";

const PUNCH_STATE: &str = "0";
const WORK_CODE: &str = "";
const SOURCE: i32 = 1;
const PURPOSE: i32 = 9;
const CRC: &str = "BADAAACAAADAAABACAJA";
const IS_MASK: i32 = 255;
const TEMPERATURE: i32 = 255;

/// One attendance punch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IclockRow {
    pub emp_code: String,
    pub punch_time: NaiveDateTime,
    pub verify_type: i32,
    pub terminal_sn: Option<String>,
    pub terminal_alias: Option<String>,
    pub area_alias: String,
    pub upload_time: NaiveDateTime,
    pub terminal_id: i32,
    pub fecha_bio: NaiveDate,
}

impl IclockRow {
    pub fn derive(
        emp_code: &str,
        punch_time: NaiveDateTime,
        door: &DoorAttributes,
        upload_time: NaiveDateTime,
    ) -> Self {
        Self {
            emp_code: emp_code.to_string(),
            punch_time,
            verify_type: door.verify_type,
            terminal_sn: door.terminal_sn.map(str::to_string),
            terminal_alias: door.terminal_alias.map(str::to_string),
            area_alias: door.area_alias.to_string(),
            upload_time,
            terminal_id: door.terminal_id,
            fecha_bio: punch_time.date(),
        }
    }

    /// Bind values matching `ICLOCK_COLUMNS`.
    pub fn to_params(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::from(self.emp_code.as_str()),
            SqlValue::from(self.punch_time),
            SqlValue::from(PUNCH_STATE),
            SqlValue::from(self.verify_type),
            SqlValue::from(WORK_CODE),
            SqlValue::from(self.terminal_sn.clone()),
            SqlValue::from(self.terminal_alias.clone()),
            SqlValue::from(self.area_alias.as_str()),
            SqlValue::from(SOURCE),
            SqlValue::from(PURPOSE),
            SqlValue::from(CRC),
            SqlValue::from(self.upload_time),
            SqlValue::Null,
            SqlValue::from(self.terminal_id),
            SqlValue::from(IS_MASK),
            SqlValue::from(TEMPERATURE),
            SqlValue::from(self.fecha_bio),
        ]
    }
}

/// Per-table constants of a monitor log.
#[derive(Debug, PartialEq, Eq)]
pub struct MonitorTarget {
    pub table: TargetTable,
    /// The only door whose events land in this table.
    pub door: &'static str,
    pub device_id: i32,
    pub device_name: &'static str,
    pub event_point_name: &'static str,
}

pub static ACC_MONITOR: MonitorTarget = MonitorTarget {
    table: TargetTable::AccMonitor,
    door: "B_Comedor_MH_Door1",
    device_id: 15,
    device_name: "ZK_Comedor_98",
    event_point_name: "ZK_Comedor_98-1",
};

pub static ACC_MONITOR_SJ: MonitorTarget = MonitorTarget {
    table: TargetTable::AccMonitorSj,
    door: "B_Comedor_A4_Door1",
    device_id: 16,
    device_name: "ZK_Comedor_99",
    event_point_name: "ZK_Comedor_99-1",
};

const MONITOR_STATUS: i32 = 200;
const MONITOR_VERIFIED: i32 = 200;
const MONITOR_STATE: i32 = 2;
const MONITOR_EVENT_TYPE: i32 = 300;
const MONITOR_EVENT_POINT_TYPE: i32 = 0;
const MONITOR_EVENT_POINT_ID: i32 = 1;

/// One dining-room access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorLogRow {
    pub target: &'static MonitorTarget,
    pub time: NaiveDateTime,
    pub pin: String,
}

impl MonitorLogRow {
    pub fn new(target: &'static MonitorTarget, time: NaiveDateTime, pin: &str) -> Self {
        Self {
            target,
            time,
            pin: pin.to_string(),
        }
    }

    /// Bind values matching `MONITOR_COLUMNS`.
    pub fn to_params(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::from(MONITOR_STATUS),
            SqlValue::from(self.time),
            SqlValue::from(self.pin.as_str()),
            SqlValue::from(self.target.device_id),
            SqlValue::from(self.target.device_name),
            SqlValue::from(MONITOR_VERIFIED),
            SqlValue::from(MONITOR_STATE),
            SqlValue::from(MONITOR_EVENT_TYPE),
            SqlValue::from(MONITOR_EVENT_POINT_TYPE),
            SqlValue::from(MONITOR_EVENT_POINT_ID),
            SqlValue::from(self.target.event_point_name),
        ]
    }
}
