//! Snapshot export and import.
//!
//! A snapshot carries model selection, global settings, the tuning of every
//! registered model and a grid of node kinds with optional per-node cycle
//! settings. Import validates the whole payload before it touches the
//! simulator. Unknown model names and out-of-range values are skipped and
//! listed in the returned [`ImportReport`].

use std::collections::BTreeMap;

use pipeflow_core::config::ConfigValue;
use pipeflow_core::error::ConfigError;
use pipeflow_core::node::NodeKind;
use pipeflow_core::production::{BATCH_SIZE, CYCLE_LENGTH};
use pipeflow_core::sim::FlowSimulator;
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

/// Current snapshot format version.
pub const FORMAT_VERSION: u32 = 1;

pub type ConfigMap = BTreeMap<String, ConfigValue>;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub pressure_model: String,
    pub clamp_model: String,
    #[serde(default)]
    pub settings: ConfigMap,
    /// Keyed by model name, for every registered pressure model.
    #[serde(default)]
    pub pressure_configs: BTreeMap<String, ConfigMap>,
    #[serde(default)]
    pub clamp_configs: BTreeMap<String, ConfigMap>,
    pub grid: GridData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridData {
    pub width: usize,
    pub height: usize,
    /// Row-major cells.
    pub cells: Vec<CellData>,
}

/// One grid cell.
///
/// Nodes with default settings are a bare kind code; sources and sinks with
/// tuned cycles carry their settings. Empty cells are `0` (or `null` where the
/// format has one).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellData {
    Empty,
    Bare(u8),
    Configured {
        kind: u8,
        cycle_length: f64,
        batch_size: f64,
    },
}

impl CellData {
    fn kind_code(self) -> u8 {
        match self {
            CellData::Empty => 0,
            CellData::Bare(code) => code,
            CellData::Configured { kind, .. } => kind,
        }
    }
}

/// What an import skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Model names that are not registered.
    pub unknown_models: Vec<String>,
    /// Values rejected by their config item. The item kept its old value.
    pub rejected: Vec<ConfigError>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.unknown_models.is_empty() && self.rejected.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Capture `sim`'s selection, tuning and grid.
pub fn export(sim: &FlowSimulator) -> Result<Snapshot, SnapshotError> {
    let grid = sim.grid().ok_or(SnapshotError::NoGrid)?;

    let cells = grid
        .cells()
        .iter()
        .map(|&id| {
            let Some(node) = sim.node(id) else {
                return CellData::Bare(0);
            };
            match node.production.as_ref() {
                Some(state) if !state.has_default_config() => CellData::Configured {
                    kind: node.kind.code(),
                    cycle_length: state.config.f64(CYCLE_LENGTH),
                    batch_size: state.config.f64(BATCH_SIZE),
                },
                _ => CellData::Bare(node.kind.code()),
            }
        })
        .collect();

    Ok(Snapshot {
        version: FORMAT_VERSION,
        pressure_model: sim.pressure_model_name().to_string(),
        clamp_model: sim.clamp_model_name().to_string(),
        settings: sim.settings().values(),
        pressure_configs: sim
            .pressure_models()
            .iter()
            .map(|m| (m.name().to_string(), m.config().values()))
            .collect(),
        clamp_configs: sim
            .clamp_models()
            .iter()
            .map(|m| (m.name().to_string(), m.config().values()))
            .collect(),
        grid: GridData {
            width: grid.width(),
            height: grid.height(),
            cells,
        },
    })
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Structural checks. Runs before any mutation.
pub fn validate(snapshot: &Snapshot) -> Result<(), SnapshotError> {
    if snapshot.version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: snapshot.version,
            expected: FORMAT_VERSION,
        });
    }

    let grid = &snapshot.grid;
    if (grid.width == 0) != (grid.height == 0) {
        return Err(SnapshotError::Malformed(format!(
            "grid {}x{} has a zero dimension",
            grid.width, grid.height
        )));
    }
    let expected = grid.width.checked_mul(grid.height).ok_or_else(|| {
        SnapshotError::Malformed(format!("grid {}x{} is too large", grid.width, grid.height))
    })?;
    if grid.cells.len() != expected {
        return Err(SnapshotError::Malformed(format!(
            "grid {}x{} needs {} cells, found {}",
            grid.width,
            grid.height,
            expected,
            grid.cells.len()
        )));
    }

    for (index, cell) in grid.cells.iter().enumerate() {
        let code = cell.kind_code();
        let kind = NodeKind::from_code(code).ok_or_else(|| {
            SnapshotError::Malformed(format!("cell {index} has unknown kind {code}"))
        })?;
        if matches!(cell, CellData::Configured { .. }) && !kind.is_producer() {
            return Err(SnapshotError::Malformed(format!(
                "cell {index} carries cycle settings but is a {kind:?}"
            )));
        }
    }
    Ok(())
}

/// Replace `sim`'s configuration and grid with `snapshot`.
///
/// A structurally invalid snapshot is rejected without changes. Otherwise the
/// import always completes; skipped names and values are reported.
pub fn import(sim: &mut FlowSimulator, snapshot: &Snapshot) -> Result<ImportReport, SnapshotError> {
    validate(snapshot)?;
    let mut report = ImportReport::default();

    if let Err(e) = sim.select_pressure_model(&snapshot.pressure_model) {
        tracing::warn!(model = %snapshot.pressure_model, "{e}");
        report.unknown_models.push(snapshot.pressure_model.clone());
    }
    if let Err(e) = sim.select_clamp_model(&snapshot.clamp_model) {
        tracing::warn!(model = %snapshot.clamp_model, "{e}");
        report.unknown_models.push(snapshot.clamp_model.clone());
    }

    report.rejected.extend(sim.apply_settings(&snapshot.settings));

    for (name, values) in &snapshot.pressure_configs {
        match sim.pressure_model_mut(name) {
            Some(model) => report.rejected.extend(model.config_mut().apply(values)),
            None => {
                tracing::warn!(model = %name, "skipping config for unknown pressure model");
                report.unknown_models.push(name.clone());
            }
        }
    }
    for (name, values) in &snapshot.clamp_configs {
        match sim.clamp_model_mut(name) {
            Some(model) => report.rejected.extend(model.config_mut().apply(values)),
            None => {
                tracing::warn!(model = %name, "skipping config for unknown clamp model");
                report.unknown_models.push(name.clone());
            }
        }
    }

    let grid = &snapshot.grid;
    sim.build_grid(grid.width, grid.height)?;
    for (index, cell) in grid.cells.iter().enumerate() {
        let (x, y) = (index % grid.width, index / grid.width);
        let kind = NodeKind::from_code(cell.kind_code()).unwrap_or_default();
        if !kind.is_present() {
            continue;
        }
        let id = sim.set_cell_kind(x, y, kind)?;

        if let CellData::Configured {
            cycle_length,
            batch_size,
            ..
        } = *cell
        {
            let state = sim.node_mut(id).and_then(|n| n.production.as_mut());
            if let Some(state) = state {
                for (name, value) in [(CYCLE_LENGTH, cycle_length), (BATCH_SIZE, batch_size)] {
                    if let Err(e) = state.config.set(name, value) {
                        report.rejected.push(e);
                    }
                }
            }
        }
    }

    for rejected in &report.rejected {
        tracing::warn!("import kept previous value: {rejected}");
    }
    tracing::debug!(
        width = grid.width,
        height = grid.height,
        unknown_models = report.unknown_models.len(),
        rejected = report.rejected.len(),
        "imported snapshot"
    );
    Ok(report)
}
