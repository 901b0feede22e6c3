//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::id::NodeId;
use crate::node::NodeKind;
use crate::sim::FlowSimulator;

// ===========================================================================
// Network builders
// ===========================================================================

/// A `len x 1` grid of pipes. Returns the simulator and the cells left to
/// right.
pub fn line_of_pipes(len: usize) -> (FlowSimulator, Vec<NodeId>) {
    let mut sim = FlowSimulator::new();
    sim.build_grid(len, 1).expect("grid");
    let ids = (0..len)
        .map(|x| sim.set_cell_kind(x, 0, NodeKind::Pipe).expect("cell"))
        .collect();
    (sim, ids)
}

/// A `width x height` grid filled with `kind`.
pub fn grid_sim(width: usize, height: usize, kind: NodeKind) -> FlowSimulator {
    let mut sim = FlowSimulator::new();
    sim.build_grid(width, height).expect("grid");
    for y in 0..height {
        for x in 0..width {
            sim.set_cell_kind(x, y, kind).expect("cell");
        }
    }
    sim
}

/// A grid of pipes with a deterministic, uneven content pattern and a few
/// tanks and holes.
pub fn patterned_grid(width: usize, height: usize) -> FlowSimulator {
    let mut sim = FlowSimulator::new();
    sim.build_grid(width, height).expect("grid");
    for y in 0..height {
        for x in 0..width {
            let kind = match (x * 31 + y * 17) % 11 {
                0 => NodeKind::None,
                1 | 2 => NodeKind::Tank,
                _ => NodeKind::Pipe,
            };
            let id = sim.set_cell_kind(x, y, kind).expect("cell");
            if kind.is_present() {
                let capacity = sim.node(id).map_or(0.0, |n| n.capacity);
                if let Some(node) = sim.node_mut(id) {
                    node.content = capacity * (((x * 7 + y * 13) % 10) as f64 / 10.0);
                }
            }
        }
    }
    sim
}

/// Source at the left end, sink at the right end, pipes between.
pub fn source_to_sink(len: usize) -> (FlowSimulator, NodeId, NodeId) {
    let (mut sim, ids) = line_of_pipes(len.max(2));
    let source = ids[0];
    let sink = ids[ids.len() - 1];
    sim.set_kind(source, NodeKind::Source).expect("source");
    sim.set_kind(sink, NodeKind::Sink).expect("sink");
    (sim, source, sink)
}

// ===========================================================================
// Assertions
// ===========================================================================

pub fn assert_close(actual: f64, expected: f64, eps: f64) {
    assert!(
        (actual - expected).abs() <= eps,
        "expected {expected}, got {actual} (eps {eps})"
    );
}
