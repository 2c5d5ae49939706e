//! # lib_attendance
//!
//! Building blocks of the attendance sync service: it keeps a session open
//! against the access-control platform (DSS), polls access records on fixed
//! intervals and migrates them into the attendance and control databases.
//!
//! Each folder is gated behind a cargo feature of the same name so the server
//! binary only pulls what it wires together. `full` (the default) enables all.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "connections")]
pub mod connections;
#[cfg(feature = "dss")]
pub mod dss;
#[cfg(feature = "ingestors")]
pub mod ingestors;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "migration")]
pub mod migration;
#[cfg(feature = "notify")]
pub mod notify;
#[cfg(feature = "retrieve")]
pub mod retrieve;

#[cfg(all(test, feature = "full"))]
pub(crate) mod testing;
