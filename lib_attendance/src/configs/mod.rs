//! # Configuration Modules
//!
//! Business parameters (vendor host, credentials, record limits, mail window)
//! live as rows in the `parametros_sistema` table instead of files. This
//! module defines the catalogue of keys and the `ParamSource` capability the
//! rest of the crate reads them through.

/// Parameter keys, the `ParamSource` trait and the typed `Settings` reader.
pub mod params;

pub use params::{keys, ParamError, ParamKey, ParamSource, Settings, StaticParams};
