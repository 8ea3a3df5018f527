//! Warehouse Loader (§4.3): scans the dated roaster directory tree,
//! consults the ledger for incremental re-ingest, and folds JSON snapshots
//! and diff-JSON updates into the warehouse.

pub mod bean_json;
pub mod diff;
pub mod loader;
pub mod scan;

pub use loader::{run, LoadReport, LoaderOptions};
