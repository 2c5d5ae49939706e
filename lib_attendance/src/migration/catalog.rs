//! # Door Catalog
//!
//! Fixed mapping from DSS door names to the attendance-terminal attributes
//! the destination tables expect. Validated once at startup.

use std::collections::HashMap;

use thiserror::Error;

use super::rows::{ACC_MONITOR, ACC_MONITOR_SJ};

/// Attributes derived for one door.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorAttributes {
    pub terminal_sn: Option<&'static str>,
    pub terminal_alias: Option<&'static str>,
    pub area_alias: &'static str,
    pub terminal_id: i32,
    pub department_id: i32,
    pub verify_type: i32,
}

impl DoorAttributes {
    const fn known(
        terminal_sn: &'static str,
        terminal_alias: &'static str,
        area_alias: &'static str,
        terminal_id: i32,
        department_id: i32,
        verify_type: i32,
    ) -> Self {
        Self {
            terminal_sn: Some(terminal_sn),
            terminal_alias: Some(terminal_alias),
            area_alias,
            terminal_id,
            department_id,
            verify_type,
        }
    }

    /// Attributes of a door missing from the catalog.
    pub const UNKNOWN: DoorAttributes = DoorAttributes {
        terminal_sn: None,
        terminal_alias: None,
        area_alias: "GENERAL",
        terminal_id: 0,
        department_id: 3,
        verify_type: 1,
    };
}

const STANDARD_DOORS: &[(&str, DoorAttributes)] = &[
    ("B_Sistemas_Tics_Door1", DoorAttributes::known("CL3S212060030", "ZK_Administracion", "ADMINISTRACION", 2, 2, 16)),
    ("B_Talento_Humano_Door1", DoorAttributes::known("CL3S212060030", "ZK_Administracion", "ADMINISTRACION", 2, 2, 16)),
    ("B_Casilleros_Mujeres_Door1", DoorAttributes::known("ECL3S211760086", "ZK_Mujeres", "AGR", 4, 4, 16)),
    ("B_Ventas_Door1", DoorAttributes::known("AEWD201860278", "ZK_Cuenca", "ADMINISTRACION", 5, 2, 1)),
    ("B_Casilleros_Hombres_Door1", DoorAttributes::known("CL3S211760214", "ZK_Hombres", "AGR", 6, 4, 16)),
    ("B_Comedor_MH_Door1", DoorAttributes::known("CL3S212060271", "ZK_Comedor", "GENERAL", 9, 3, 16)),
    ("B_Comedor_A4_Door1", DoorAttributes::known("A43S212060270", "ZK_Comedor_A4", "GENERAL", 17, 3, 16)),
    ("B_Casilleros_A4_Door1", DoorAttributes::known("CL3S212060270", "ZK_San_Juan", "AGR", 11, 4, 16)),
    ("B_Contabilidad_Door1", DoorAttributes::known("CL3S212060259", "ZK_Cuenca_Ventas", "ADMINISTRACION", 14, 2, 1)),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("door {0} is listed twice")]
    DuplicateDoor(String),

    #[error("door {0} has no terminal serial or alias")]
    IncompleteDoor(String),

    #[error("monitor door {0} is missing from the catalog")]
    MissingMonitorDoor(&'static str),
}

#[derive(Debug, Clone)]
pub struct DoorCatalog {
    doors: HashMap<&'static str, DoorAttributes>,
}

impl DoorCatalog {
    /// The production door set.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::from_entries(STANDARD_DOORS)
    }

    /// Builds and validates a catalog.
    pub fn from_entries(entries: &[(&'static str, DoorAttributes)]) -> Result<Self, CatalogError> {
        let mut doors = HashMap::with_capacity(entries.len());
        for (point, attrs) in entries {
            let complete = matches!(attrs.terminal_sn, Some(sn) if !sn.is_empty())
                && matches!(attrs.terminal_alias, Some(alias) if !alias.is_empty());
            if !complete {
                return Err(CatalogError::IncompleteDoor(point.to_string()));
            }
            if doors.insert(*point, *attrs).is_some() {
                return Err(CatalogError::DuplicateDoor(point.to_string()));
            }
        }

        for door in [ACC_MONITOR.door, ACC_MONITOR_SJ.door] {
            if !doors.contains_key(door) {
                return Err(CatalogError::MissingMonitorDoor(door));
            }
        }
        Ok(Self { doors })
    }

    /// Attributes for `point`, falling back to `DoorAttributes::UNKNOWN`.
    pub fn lookup(&self, point: &str) -> DoorAttributes {
        self.doors
            .get(point)
            .copied()
            .unwrap_or(DoorAttributes::UNKNOWN)
    }

    pub fn len(&self) -> usize {
        self.doors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doors.is_empty()
    }
}
