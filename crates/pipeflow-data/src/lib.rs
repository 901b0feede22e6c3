//! Snapshot persistence for pipeflow networks.
//!
//! - [`snapshot`]: the snapshot data model, export and validated import.
//! - [`format`]: RON, JSON and TOML encoding with extension-based detection.
//! - [`error`]: [`SnapshotError`].

pub mod error;
pub mod format;
pub mod snapshot;

pub use error::SnapshotError;
pub use format::{Format, load, save};
pub use snapshot::{CellData, FORMAT_VERSION, ImportReport, Snapshot, export, import};
