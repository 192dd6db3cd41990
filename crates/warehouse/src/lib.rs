//! Warehouse sink for normalized records.
//!
//! A warehouse keeps a primary table plus `replica_count` replica tables and
//! writes every loaded record to all of them. Two backends share the
//! [`Warehouse`] contract:
//!
//! - **memory**: vectors behind a lock, lost on exit
//! - **file**: one JSON-lines file per table under a directory

pub mod backend;
pub mod error;
pub mod file;
pub mod memory;
pub mod record;
pub mod traits;

pub use backend::{create_warehouse, WarehouseBackend};
pub use error::WarehouseError;
pub use file::FileWarehouse;
pub use memory::MemoryWarehouse;
pub use record::TransformedRecord;
pub use traits::{Warehouse, WarehouseMetrics};
