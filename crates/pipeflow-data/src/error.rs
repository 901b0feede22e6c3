use std::path::PathBuf;

use pipeflow_core::error::SimError;

use crate::format::Format;

/// Errors that can occur while exporting, importing or loading snapshots.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The payload is structurally invalid. Nothing was applied.
    #[error("malformed snapshot: {0}")]
    Malformed(String),

    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Export needs a grid layout to lay out cells.
    #[error("simulator has no grid layout to export")]
    NoGrid,

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    #[error("parse error in {source_name}: {detail}")]
    Parse { source_name: String, detail: String },

    #[error("could not encode snapshot as {format:?}: {detail}")]
    Encode { format: Format, detail: String },

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SnapshotError {
    /// True when the snapshot was rejected before touching the simulator.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            SnapshotError::Malformed(_) | SnapshotError::UnsupportedVersion { .. }
        )
    }
}
