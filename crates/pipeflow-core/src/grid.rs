//! Rectangular grid layout over a [`FlowGraph`].
//!
//! Every cell owns one node (initially [`NodeKind::None`]) and is connected to
//! its orthogonal neighbours, so placing or clearing a building is a kind
//! change and never a topology change.

use slotmap::SecondaryMap;

use crate::error::GraphError;
use crate::graph::FlowGraph;
use crate::id::NodeId;
use crate::node::NodeKind;

#[derive(Debug, Clone, Default)]
pub struct GridLayout {
    width: usize,
    height: usize,
    /// Row-major, `y * width + x`.
    cells: Vec<NodeId>,
    positions: SecondaryMap<NodeId, (usize, usize)>,
}

impl GridLayout {
    /// Add `width * height` empty nodes to `graph` and wire them up.
    pub fn build(graph: &mut FlowGraph, width: usize, height: usize) -> Result<Self, GraphError> {
        let mut cells = Vec::with_capacity(width * height);
        let mut positions = SecondaryMap::new();
        for y in 0..height {
            for x in 0..width {
                let id = graph.add_node(NodeKind::None, 0.0);
                cells.push(id);
                positions.insert(id, (x, y));
            }
        }

        for y in 0..height {
            for x in 0..width {
                let here = cells[y * width + x];
                if x + 1 < width {
                    graph.connect(here, cells[y * width + x + 1])?;
                }
                if y + 1 < height {
                    graph.connect(here, cells[(y + 1) * width + x])?;
                }
            }
        }

        Ok(Self {
            width,
            height,
            cells,
            positions,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<NodeId> {
        (x < self.width && y < self.height).then(|| self.cells[y * self.width + x])
    }

    /// Like [`cell`](Self::cell) but reports the bounds on failure.
    pub fn try_cell(&self, x: usize, y: usize) -> Result<NodeId, GraphError> {
        self.cell(x, y).ok_or(GraphError::CellOutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        })
    }

    pub fn position(&self, node: NodeId) -> Option<(usize, usize)> {
        self.positions.get(node).copied()
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[NodeId] {
        &self.cells
    }
}
