//! # Notification Module
//!
//! Failure alerts leave the process through a `Notifier`. The production
//! notifier is gated by two parameter-table switches (the `send_mail` flag
//! and an hour window) and hands accepted alerts to an `AlertTransport`.
//! `FailureReporter` pairs an alert with a row in the audit log.

/// Window/flag gated notifier and its transports.
pub mod gated;

/// Alert plus audit-log persistence for a failure.
pub mod reporter;

pub use gated::{AlertError, AlertTransport, GateDecision, GatedNotifier, LogTransport, Notifier};
pub use reporter::{Failure, FailureReporter};
