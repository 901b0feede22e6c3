//! The flow graph: an arena of nodes and edges addressed by slotmap handles.
//!
//! Edges are owned by the graph, never by a node. Each node's incident edges
//! live in an adjacency `SecondaryMap` keyed by `NodeId`, which keeps the
//! adjacency table in step with the primary `nodes` SlotMap. Every topology
//! change recomputes the connection counts of the nodes it touches.

use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

use crate::error::GraphError;
use crate::id::{EdgeId, NodeId};
use crate::node::{Edge, Node, NodeKind};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowGraph {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) edges: SlotMap<EdgeId, Edge>,
    pub(crate) adjacency: SecondaryMap<NodeId, Vec<EdgeId>>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            adjacency: SecondaryMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Add an unconnected node.
    pub fn add_node(&mut self, kind: NodeKind, capacity: f64) -> NodeId {
        let id = self.nodes.insert(Node::new(kind, capacity));
        self.adjacency.insert(id, Vec::new());
        id
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, node: NodeId) -> Result<Node, GraphError> {
        let incident = self
            .adjacency
            .remove(node)
            .ok_or(GraphError::NodeNotFound(node))?;

        let mut neighbours = Vec::with_capacity(incident.len());
        for edge_id in incident {
            if let Some(edge) = self.edges.remove(edge_id) {
                let other = edge.other(node);
                if let Some(adj) = self.adjacency.get_mut(other) {
                    adj.retain(|&e| e != edge_id);
                }
                neighbours.push(other);
            }
        }

        let removed = self
            .nodes
            .remove(node)
            .ok_or(GraphError::NodeNotFound(node))?;
        for n in neighbours {
            self.recount(n);
        }
        Ok(removed)
    }

    /// Connect two nodes. Connecting an already connected pair returns the
    /// existing edge.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<EdgeId, GraphError> {
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        for n in [a, b] {
            if !self.nodes.contains_key(n) {
                return Err(GraphError::NodeNotFound(n));
            }
        }
        if let Some(existing) = self.edge_between(a, b) {
            return Ok(existing);
        }

        let edge_id = self.edges.insert(Edge::new(a, b));
        for n in [a, b] {
            if let Some(adj) = self.adjacency.get_mut(n) {
                adj.push(edge_id);
            }
        }
        self.recount(a);
        self.recount(b);
        Ok(edge_id)
    }

    pub fn disconnect(&mut self, edge: EdgeId) -> Result<(), GraphError> {
        let data = self
            .edges
            .remove(edge)
            .ok_or(GraphError::EdgeNotFound(edge))?;
        for n in [data.a, data.b] {
            if let Some(adj) = self.adjacency.get_mut(n) {
                adj.retain(|&e| e != edge);
            }
            self.recount(n);
        }
        Ok(())
    }

    /// Change a node's kind.
    ///
    /// Resets the node's content, production state and statistics, zeroes the
    /// momentum of every incident edge, and recomputes connection counts for
    /// the node and its neighbours.
    pub fn set_kind(&mut self, node: NodeId, kind: NodeKind, capacity: f64) -> Result<(), GraphError> {
        let n = self
            .nodes
            .get_mut(node)
            .ok_or(GraphError::NodeNotFound(node))?;
        n.reset(kind, capacity);

        let incident = self.adjacency.get(node).cloned().unwrap_or_default();
        for &edge_id in &incident {
            if let Some(edge) = self.edges.get_mut(edge_id) {
                edge.clear_motion();
            }
        }
        self.recount(node);
        for edge_id in incident {
            if let Some(other) = self.edges.get(edge_id).map(|e| e.other(node)) {
                self.recount(other);
            }
        }
        Ok(())
    }

    /// Remove every node and edge.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.adjacency.clear();
    }

    /// Recompute `connection_count` for a single node.
    fn recount(&mut self, node: NodeId) {
        let present = self.nodes.get(node).is_some_and(Node::is_present);
        let count = if present {
            self.adjacency
                .get(node)
                .map(|adj| {
                    adj.iter()
                        .filter_map(|e| self.edges.get(*e))
                        .filter(|e| self.nodes.get(e.other(node)).is_some_and(Node::is_present))
                        .count() as u32
                })
                .unwrap_or(0)
        } else {
            0
        };
        if let Some(n) = self.nodes.get_mut(node) {
            n.connection_count = count;
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node)
    }

    pub fn node_mut(&mut self, node: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node)
    }

    pub fn edge(&self, edge: EdgeId) -> Option<&Edge> {
        self.edges.get(edge)
    }

    /// Edges touching `node`.
    pub fn edges_of(&self, node: NodeId) -> &[EdgeId] {
        self.adjacency
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn neighbours(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges_of(node)
            .iter()
            .filter_map(move |e| self.edges.get(*e).map(|edge| edge.other(node)))
    }

    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.edges_of(a)
            .iter()
            .copied()
            .find(|e| self.edges.get(*e).is_some_and(|edge| edge.touches(b)))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// Sum of content over every node.
    pub fn total_content(&self) -> f64 {
        self.nodes.values().map(|n| n.content).sum()
    }
}
