//! Backend selection.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WarehouseError};
use crate::file::FileWarehouse;
use crate::memory::MemoryWarehouse;
use crate::traits::Warehouse;

/// Which warehouse implementation to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseBackend {
    #[default]
    Memory,
    File,
}

impl FromStr for WarehouseBackend {
    type Err = WarehouseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(WarehouseBackend::Memory),
            "file" => Ok(WarehouseBackend::File),
            other => Err(WarehouseError::UnknownBackend(other.to_owned())),
        }
    }
}

impl fmt::Display for WarehouseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarehouseBackend::Memory => f.write_str("memory"),
            WarehouseBackend::File => f.write_str("file"),
        }
    }
}

/// Build the configured backend. `path` is only used by the file backend.
pub fn create_warehouse(
    backend: WarehouseBackend,
    replica_count: usize,
    path: &Path,
) -> Result<Arc<dyn Warehouse>> {
    Ok(match backend {
        WarehouseBackend::Memory => Arc::new(MemoryWarehouse::new(replica_count)),
        WarehouseBackend::File => Arc::new(FileWarehouse::new(path, replica_count)?),
    })
}
