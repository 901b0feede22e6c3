//! Clamp models: bounding proposed flow against content, free space and a
//! policy share.
//!
//! Every clamp is evaluated twice per edge per tick. The
//! [`ClampPass::FlowSpeed`] pass bounds the persisted momentum; the
//! [`ClampPass::FluidMove`] pass bounds the amount actually transferred. A
//! policy can therefore dampen transport without dampening the wave.
//!
//! The contested-ratio variant leaves the per-edge pass untouched and instead
//! rations all of a node's edges at once in [`fairness_pass`].

use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::config::{ConfigItem, ConfigSet};
use crate::graph::FlowGraph;
use crate::id::NodeId;
use crate::node::Node;

pub const MIN_DIVIDER: &str = "min_divider";
pub const MAX_DIVIDER: &str = "max_divider";
pub const MAINTAIN_FLOW_SPEED: &str = "maintain_flow_speed";

/// Which quantity a clamp call bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClampPass {
    /// The momentum carried to the next tick.
    FlowSpeed,
    /// The content moved this tick.
    FluidMove,
}

/// Result of a clamp: the bounded value and how much of the cut was due to
/// policy rather than physics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClampOutcome {
    pub value: f64,
    pub policy_clamped: f64,
}

/// Bound a non-negative `flow` by `limit`.
///
/// `content` is the physical budget (content for withdrawals, free space for
/// deposits). Nothing moves when it is empty. `policy_clamped` is the part of
/// the cut that exceeds what the physical budget alone would have removed.
pub fn clamp_flow(content: f64, flow: f64, limit: f64) -> ClampOutcome {
    if content <= 0.0 {
        return ClampOutcome::default();
    }
    let natural = (flow - content).max(0.0);
    let imposed = (flow - limit).max(0.0);
    ClampOutcome {
        value: if flow <= limit { flow } else { limit },
        policy_clamped: (imposed - natural).max(0.0),
    }
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClampKind {
    QuarterLimit,
    ConnectionCount,
    Overcommit,
    ContestedRatio,
}

impl ClampKind {
    pub const ALL: [ClampKind; 4] = [
        ClampKind::QuarterLimit,
        ClampKind::ConnectionCount,
        ClampKind::Overcommit,
        ClampKind::ContestedRatio,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClampKind::QuarterLimit => "Quarter Limit",
            ClampKind::ConnectionCount => "Connection Count Limit",
            ClampKind::Overcommit => "Overcommit Clamping",
            ClampKind::ContestedRatio => "Contested Ratio Clamping",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ClampKind::QuarterLimit => {
                "No edge may take more than a quarter of a node's content or free space."
            }
            ClampKind::ConnectionCount => {
                "A node's content and free space are split evenly between its connections."
            }
            ClampKind::Overcommit => {
                "Edges may each claim a configurable share; momentum can be kept unclamped."
            }
            ClampKind::ContestedRatio => {
                "Edges are unclamped individually, then rationed per node so no node overdraws."
            }
        }
    }

    pub fn from_name(name: &str) -> Option<ClampKind> {
        ClampKind::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn default_config(self) -> ConfigSet {
        let maintain = |value| {
            ConfigItem::flag(value, "Keep momentum independent of the clamped move")
        };
        match self {
            ClampKind::QuarterLimit | ClampKind::ConnectionCount => ConfigSet::new(),
            ClampKind::Overcommit => ConfigSet::new()
                .with(
                    MIN_DIVIDER,
                    ConfigItem::number(1.0, 1.0, 4.0, "Divider applied to outgoing content"),
                )
                .with(
                    MAX_DIVIDER,
                    ConfigItem::number(1.0, 1.0, 4.0, "Divider applied to incoming free space"),
                )
                .with(MAINTAIN_FLOW_SPEED, maintain(true)),
            ClampKind::ContestedRatio => ConfigSet::new().with(MAINTAIN_FLOW_SPEED, maintain(false)),
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClampModel {
    pub kind: ClampKind,
    config: ConfigSet,
}

impl ClampModel {
    pub fn new(kind: ClampKind) -> Self {
        Self {
            kind,
            config: kind.default_config(),
        }
    }

    pub fn all() -> Vec<ClampModel> {
        ClampKind::ALL.into_iter().map(ClampModel::new).collect()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn description(&self) -> &'static str {
        self.kind.description()
    }

    pub fn config(&self) -> &ConfigSet {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigSet {
        &mut self.config
    }

    /// Whether [`fairness_pass`] must run after the per-edge clamps.
    pub fn has_fairness_pass(&self) -> bool {
        self.kind == ClampKind::ContestedRatio
    }

    /// Whether the fairness pass copies the rationed move back into momentum.
    pub fn resync_flow(&self) -> bool {
        self.has_fairness_pass() && !self.config.flag(MAINTAIN_FLOW_SPEED)
    }

    /// Clamp a signed flow on the edge `a -> b`.
    ///
    /// The flow is split into the node it leaves (`src`) and the node it
    /// enters (`dst`); the outflow limit is checked against the source's
    /// content, then the inflow limit against the destination's free space.
    pub fn clamp(&self, flow: f64, pass: ClampPass, a: &Node, b: &Node) -> ClampOutcome {
        let (src, dst, magnitude, sign) = if flow >= 0.0 {
            (a, b, flow, 1.0)
        } else {
            (b, a, -flow, -1.0)
        };
        let content = src.content;
        let free = dst.free_space();

        let (out_limit, in_limit) = match self.kind {
            ClampKind::QuarterLimit => (Some(0.25 * content), Some(0.25 * free)),
            ClampKind::ConnectionCount => (
                Some(content / src.connection_count().max(1) as f64),
                Some(free / dst.connection_count().max(1) as f64),
            ),
            ClampKind::Overcommit => {
                let maintain = self.config.flag(MAINTAIN_FLOW_SPEED);
                let out = (pass == ClampPass::FluidMove || !maintain)
                    .then(|| content / self.config.f64(MIN_DIVIDER));
                let inn = (pass == ClampPass::FluidMove || !maintain)
                    .then(|| free / self.config.f64(MAX_DIVIDER));
                (out, inn)
            }
            ClampKind::ContestedRatio => (None, None),
        };

        let mut outcome = ClampOutcome {
            value: magnitude,
            policy_clamped: 0.0,
        };
        if let Some(limit) = out_limit {
            let step = clamp_flow(content, outcome.value, limit);
            outcome.value = step.value;
            outcome.policy_clamped += step.policy_clamped;
        }
        if let Some(limit) = in_limit {
            let step = clamp_flow(free, outcome.value, limit);
            outcome.value = step.value;
            outcome.policy_clamped += step.policy_clamped;
        }
        outcome.value *= sign;
        outcome
    }
}

// ---------------------------------------------------------------------------
// Contested fairness
// ---------------------------------------------------------------------------

/// Ration every edge's move so that, across all of a node's edges at once,
/// withdrawals never exceed its content and deposits never exceed its free
/// space.
///
/// Ratios are computed for every node from the incoming moves before any edge
/// is rescaled; each move is then scaled by the smaller of its source's
/// outflow ratio and its destination's inflow ratio. With `resync_flow` the
/// persisted momentum is set to the rationed move.
pub(crate) fn fairness_pass(graph: &mut FlowGraph, resync_flow: bool) {
    let FlowGraph {
        nodes,
        edges,
        adjacency,
    } = graph;

    let mut ratios: SecondaryMap<NodeId, (f64, f64)> = SecondaryMap::with_capacity(nodes.len());
    for (id, node) in nodes.iter() {
        let (mut r_out, mut r_in) = (0.0, 0.0);
        for edge in adjacency
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|e| edges.get(*e))
        {
            let out = edge.outflow_from(id);
            if out > 0.0 {
                r_out += out;
            } else {
                r_in -= out;
            }
        }
        let free = node.free_space();
        let ratio_out = if r_out <= node.content {
            1.0
        } else {
            node.content.max(0.0) / r_out
        };
        let ratio_in = if r_in <= free { 1.0 } else { free.max(0.0) / r_in };
        ratios.insert(id, (ratio_out, ratio_in));
    }

    for edge in edges.values_mut() {
        let (src, dst) = edge.move_endpoints();
        let ratio_out = ratios.get(src).map_or(1.0, |r| r.0);
        let ratio_in = ratios.get(dst).map_or(1.0, |r| r.1);
        edge.moved *= ratio_out.min(ratio_in);
        if resync_flow {
            edge.flow = edge.moved;
        }
    }
}
