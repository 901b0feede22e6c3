//! Node and edge data stored in the flow graph.

use serde::{Deserialize, Serialize};

use crate::id::NodeId;
use crate::production::ProductionState;

// ---------------------------------------------------------------------------
// Node kind
// ---------------------------------------------------------------------------

/// What a node is. `None` marks a hole: the node exists in the arena (so grid
/// positions stay stable) but takes no part in flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    None,
    Pipe,
    Source,
    Sink,
    Tank,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::None,
        NodeKind::Pipe,
        NodeKind::Source,
        NodeKind::Sink,
        NodeKind::Tank,
    ];

    /// Compact numeric code used by snapshots. `None` is 0.
    pub fn code(self) -> u8 {
        match self {
            NodeKind::None => 0,
            NodeKind::Pipe => 1,
            NodeKind::Source => 2,
            NodeKind::Sink => 3,
            NodeKind::Tank => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<NodeKind> {
        NodeKind::ALL.get(code as usize).copied()
    }

    pub fn is_present(self) -> bool {
        self != NodeKind::None
    }

    /// Sources and sinks carry a production/consumption cycle.
    pub fn is_producer(self) -> bool {
        matches!(self, NodeKind::Source | NodeKind::Sink)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A storage cell.
///
/// `0 <= content <= capacity` is expected but not enforced; the integration
/// scheme may overshoot transiently and the simulator records the excursion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub content: f64,
    /// Content at the start of the current tick.
    pub prev_content: f64,
    /// Net content lost over the latest completed tick, never negative.
    #[serde(default)]
    pub drained: f64,
    pub capacity: f64,
    /// Present neighbours. Maintained by the graph on every topology change.
    pub(crate) connection_count: u32,
    /// `max(inbound, outbound)` transferred during the latest tick.
    pub flow_rate: f64,
    /// Only set for sources and sinks.
    pub production: Option<ProductionState>,
}

impl Node {
    pub fn new(kind: NodeKind, capacity: f64) -> Self {
        Self {
            kind,
            content: 0.0,
            prev_content: 0.0,
            drained: 0.0,
            capacity: if kind.is_present() { capacity } else { 0.0 },
            connection_count: 0,
            flow_rate: 0.0,
            production: kind.is_producer().then(ProductionState::new),
        }
    }

    pub fn is_present(&self) -> bool {
        self.kind.is_present()
    }

    pub fn connection_count(&self) -> u32 {
        self.connection_count
    }

    /// Remaining room before the node is full. Negative when overflowing.
    pub fn free_space(&self) -> f64 {
        self.capacity - self.content
    }

    /// Content as a fraction of capacity (0 for zero-capacity nodes).
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity > 0.0 {
            self.content / self.capacity
        } else {
            0.0
        }
    }

    /// Clear all dynamic state, as done when the kind changes.
    pub(crate) fn reset(&mut self, kind: NodeKind, capacity: f64) {
        let count = self.connection_count;
        *self = Node::new(kind, capacity);
        self.connection_count = count;
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// A connector between two nodes.
///
/// Positive `flow` and `moved` point from `a` to `b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
    /// Persisted momentum, carried from tick to tick.
    pub flow: f64,
    /// Content actually transferred during the latest tick.
    pub moved: f64,
    /// Set once this edge has been processed in the current tick.
    #[serde(skip)]
    pub resolved: bool,
}

impl Edge {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        Self {
            a,
            b,
            flow: 0.0,
            moved: 0.0,
            resolved: false,
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.a == node || self.b == node
    }

    /// The endpoint that is not `node`.
    pub fn other(&self, node: NodeId) -> NodeId {
        if self.a == node { self.b } else { self.a }
    }

    /// `moved` as seen from `node`: positive when content leaves `node`.
    pub fn outflow_from(&self, node: NodeId) -> f64 {
        if self.a == node { self.moved } else { -self.moved }
    }

    /// (source, destination) for the current move direction.
    pub fn move_endpoints(&self) -> (NodeId, NodeId) {
        if self.moved >= 0.0 {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }

    pub(crate) fn clear_motion(&mut self) {
        self.flow = 0.0;
        self.moved = 0.0;
    }
}
