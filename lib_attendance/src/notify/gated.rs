use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::configs::{keys, Settings};
use crate::connections::{upload_clock, AuditEntry, AuditLog, Database};

/// Subject line of every alert.
pub const ALERT_SUBJECT: &str = "API Dahua - Notificación";

/// Anything that can raise an operator alert.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert delivery failed: {0}")]
    Delivery(String),
}

/// Final hop of an alert (mail relay, chat hook, log sink).
#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn deliver(&self, subject: &str, body: &str) -> Result<(), AlertError>;
}

/// Emits alerts as `tracing` events on the `alerts` target, for a log
/// shipper or mail relay to pick up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl AlertTransport for LogTransport {
    async fn deliver(&self, subject: &str, body: &str) -> Result<(), AlertError> {
        warn!(target: "alerts", subject, "{}", body);
        Ok(())
    }
}

/// Outcome of one `notify` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Sent,
    OutsideWindow,
    Disabled,
    DeliveryFailed,
}

/// Notifier gated by the `send_mail` flag and the mail hour window, both
/// read from the parameter table on every call. The window is inclusive and
/// evaluated on the upload clock.
pub struct GatedNotifier {
    settings: Settings,
    transport: Arc<dyn AlertTransport>,
    audit: Option<AuditLog>,
}

impl GatedNotifier {
    pub fn new(settings: Settings, transport: Arc<dyn AlertTransport>) -> Self {
        Self {
            settings,
            transport,
            audit: None,
        }
    }

    /// Records disabled/failed deliveries in the audit log.
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    async fn within_window(&self, now: DateTime<Utc>) -> bool {
        let start = self.settings.parse::<u32>(keys::MAIL_WINDOW_START).await;
        let end = self.settings.parse::<u32>(keys::MAIL_WINDOW_END).await;
        let (start, end) = match (start, end) {
            (Ok(start), Ok(end)) => (start, end),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "mail window not configured, alert suppressed");
                return false;
            }
        };
        let (Some(start), Some(end)) = (
            NaiveTime::from_hms_opt(start, 0, 0),
            NaiveTime::from_hms_opt(end, 0, 0),
        ) else {
            warn!(start, end, "mail window hours out of range, alert suppressed");
            return false;
        };

        let clock = upload_clock(now).time();
        clock >= start && clock <= end
    }

    async fn enabled(&self) -> bool {
        match self.settings.optional(keys::MAIL_ENABLED).await {
            Ok(flag) => flag.as_deref() == Some("E"),
            Err(e) => {
                warn!(error = %e, "mail flag unreadable, alerts disabled");
                false
            }
        }
    }

    /// Applies both gates at `now` and delivers when they pass.
    pub async fn notify_at(&self, message: &str, now: DateTime<Utc>) -> GateDecision {
        if !self.within_window(now).await {
            debug!("alert outside the mail window");
            return GateDecision::OutsideWindow;
        }

        if !self.enabled().await {
            info!("alert mail disabled");
            if let Some(audit) = &self.audit {
                let entry = AuditEntry::info(Database::Attendance, "alert mail disabled", "mail", 200);
                audit.record_best_effort(&entry).await;
            }
            return GateDecision::Disabled;
        }

        match self.transport.deliver(ALERT_SUBJECT, message).await {
            Ok(()) => GateDecision::Sent,
            Err(e) => {
                warn!(error = %e, "alert delivery failed");
                if let Some(audit) = &self.audit {
                    let entry = AuditEntry::error(Database::Attendance, e.to_string(), "mail", 404);
                    audit.record_best_effort(&entry).await;
                }
                GateDecision::DeliveryFailed
            }
        }
    }
}

#[async_trait]
impl Notifier for GatedNotifier {
    async fn notify(&self, message: &str) {
        self.notify_at(message, Utc::now()).await;
    }
}
