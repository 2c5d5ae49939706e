//! # Connections Module
//!
//! This module handles the relational databases the service reads from and
//! writes into: the store abstraction itself, its PostgreSQL implementation,
//! and the two tables every component shares (parameters and audit log).

/// Store trait, logical databases and SQL values.
pub mod store;

/// Module for PostgreSQL database connection pooling and management.
pub mod db_postgres;

/// `ParamSource` backed by the `parametros_sistema` table.
pub mod param_table;

/// Failure records persisted into `logs_info`.
pub mod audit;

pub use audit::{AuditEntry, AuditLog, LogGroup};
pub use db_postgres::PgStore;
pub use param_table::SqlParamSource;
pub use store::{upload_clock, Database, RelationalStore, SqlRow, SqlValue, StoreError};
