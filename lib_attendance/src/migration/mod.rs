//! # Migration Module
//!
//! Turns normalized access events into rows of the three destination tables.
//! Every record goes through the same gauntlet: parse, derive static
//! attributes from the door catalog, exact-duplicate check, 30-minute
//! cooldown per pin, then insert. Records fail independently.

/// Door catalog: point name to terminal, area and department attributes.
pub mod catalog;

/// Destination row layouts.
pub mod rows;

/// Destination tables and the store operations the migrators need.
pub mod target;

/// The migrators and their per-page reports.
pub mod engine;

pub use catalog::{CatalogError, DoorAttributes, DoorCatalog};
pub use engine::{
    IclockMigrator, MigrationContext, MigrationError, MigrationReport, Migrator,
    MonitorLogMigrator, Outcome, COOLDOWN_SECS,
};
pub use rows::{IclockRow, MonitorLogRow, MonitorTarget, ACC_MONITOR, ACC_MONITOR_SJ};
pub use target::{Employee, SqlTargetStore, TargetStore, TargetTable};
