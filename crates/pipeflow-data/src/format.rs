//! Text formats for snapshots: RON, JSON and TOML, detected from the file
//! extension.

use std::path::Path;

use pipeflow_core::sim::FlowSimulator;

use crate::error::SnapshotError;
use crate::snapshot::{self, ImportReport, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format from a file extension.
pub fn detect_format(path: &Path) -> Result<Format, SnapshotError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(SnapshotError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Encoding
// ===========================================================================

pub fn to_string(snapshot: &Snapshot, format: Format) -> Result<String, SnapshotError> {
    let encoded = match format {
        Format::Ron => ron::ser::to_string_pretty(snapshot, ron::ser::PrettyConfig::default())
            .map_err(|e| e.to_string()),
        Format::Json => serde_json::to_string_pretty(snapshot).map_err(|e| e.to_string()),
        Format::Toml => toml::to_string_pretty(snapshot).map_err(|e| e.to_string()),
    };
    encoded.map_err(|detail| SnapshotError::Encode { format, detail })
}

/// Parse a snapshot. `source_name` labels parse errors.
pub fn from_str(text: &str, format: Format, source_name: &str) -> Result<Snapshot, SnapshotError> {
    let parsed = match format {
        Format::Ron => ron::from_str(text).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
    };
    parsed.map_err(|detail| SnapshotError::Parse {
        source_name: source_name.to_string(),
        detail,
    })
}

// ===========================================================================
// Files
// ===========================================================================

pub fn read_file(path: &Path) -> Result<Snapshot, SnapshotError> {
    let format = detect_format(path)?;
    let text = std::fs::read_to_string(path)?;
    from_str(&text, format, &path.display().to_string())
}

pub fn write_file(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let format = detect_format(path)?;
    std::fs::write(path, to_string(snapshot, format)?)?;
    Ok(())
}

/// Export `sim` and write it to `path`.
pub fn save(sim: &FlowSimulator, path: &Path) -> Result<(), SnapshotError> {
    let snap = snapshot::export(sim)?;
    write_file(path, &snap)?;
    tracing::debug!(path = %path.display(), "saved snapshot");
    Ok(())
}

/// Read `path` and import it into `sim`.
pub fn load(sim: &mut FlowSimulator, path: &Path) -> Result<ImportReport, SnapshotError> {
    let snap = read_file(path)?;
    snapshot::import(sim, &snap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{CellData, export};
    use pipeflow_core::node::NodeKind;
    use pipeflow_core::test_utils::*;

    fn sample() -> Snapshot {
        let mut sim = grid_sim(2, 2, NodeKind::Pipe);
        let source = sim.set_cell_kind(0, 0, NodeKind::Source).unwrap();
        sim.set_cell_kind(1, 1, NodeKind::None).unwrap();
        sim.set_node_production(source, 20.0, 40.0).unwrap();
        export(&sim).unwrap()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pipeflow_{}_{name}", std::process::id()))
    }

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("net.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("net.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("net.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("net.yaml")),
            Err(SnapshotError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("net")),
            Err(SnapshotError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn every_format_round_trips() {
        let snap = sample();
        for format in [Format::Ron, Format::Json, Format::Toml] {
            let text = to_string(&snap, format).unwrap();
            let back = from_str(&text, format, "memory").unwrap();
            assert_eq!(back, snap, "{format:?} round trip");
        }
    }

    #[test]
    fn json_cells_are_compact() {
        let text = to_string(&sample(), Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let cells = &value["grid"]["cells"];
        assert_eq!(cells[1], serde_json::json!(1));
        assert_eq!(cells[3], serde_json::json!(0));
        assert_eq!(cells[0]["cycle_length"], serde_json::json!(20.0));
        assert_eq!(
            from_str(&text, Format::Json, "x").unwrap().grid.cells[3],
            CellData::Bare(0)
        );
    }

    #[test]
    fn parse_errors_name_their_source() {
        let err = from_str("{ not json", Format::Json, "broken.json").unwrap_err();
        match err {
            SnapshotError::Parse { source_name, .. } => assert_eq!(source_name, "broken.json"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn save_and_load_through_files() {
        let path = temp_path("net.json");
        let mut sim = grid_sim(3, 1, NodeKind::Tank);
        save(&sim, &path).unwrap();

        sim.build_grid(1, 1).unwrap();
        let report = load(&mut sim, &path).unwrap();
        assert!(report.is_clean());
        assert_eq!(sim.grid().unwrap().width(), 3);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut sim = grid_sim(1, 1, NodeKind::Pipe);
        let err = load(&mut sim, &temp_path("missing.ron")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io(_)));
    }
}
