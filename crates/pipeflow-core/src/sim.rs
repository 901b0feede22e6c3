//! The flow simulator: one network, its models, settings and statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clamp::{self, ClampModel, ClampPass};
use crate::config::{ConfigSet, ConfigValue};
use crate::error::{ConfigError, GraphError, SimError};
use crate::graph::FlowGraph;
use crate::grid::GridLayout;
use crate::id::{EdgeId, NodeId};
use crate::node::{Node, NodeKind};
use crate::pressure::PressureModel;
use crate::production::{self, BATCH_SIZE, CYCLE_LENGTH};
use crate::settings::{self, PIPE_CAPACITY, TANK_CAPACITY};
use crate::stats::StatTracker;

// ---------------------------------------------------------------------------
// Tick results
// ---------------------------------------------------------------------------

/// Stat frames published by a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick number that produced this report, starting at 1.
    pub tick: u64,
    pub underflow: f64,
    pub overflow: f64,
    pub flow_clamped: f64,
    pub total_content: f64,
}

/// Result of [`FlowSimulator::advance`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AdvanceResult {
    pub steps_run: u64,
    /// Report of the final tick, if any ran.
    pub last: Option<TickReport>,
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Owns one network and advances it a tick at a time.
///
/// Both model registries hold every variant so that tuning survives a switch.
/// Model selection is queued and takes effect at the start of the next tick.
#[derive(Debug, Clone)]
pub struct FlowSimulator {
    graph: FlowGraph,
    grid: Option<GridLayout>,
    pressure_models: Vec<PressureModel>,
    clamp_models: Vec<ClampModel>,
    active_pressure: usize,
    active_clamp: usize,
    pending_pressure: Option<usize>,
    pending_clamp: Option<usize>,
    settings: ConfigSet,
    stats: StatTracker,
    tick: u64,
}

impl Default for FlowSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowSimulator {
    /// An empty network using the wave equation and the quarter limit.
    pub fn new() -> Self {
        Self {
            graph: FlowGraph::new(),
            grid: None,
            pressure_models: PressureModel::all(),
            clamp_models: ClampModel::all(),
            active_pressure: 0,
            active_clamp: 0,
            pending_pressure: None,
            pending_clamp: None,
            settings: settings::default_settings(),
            stats: StatTracker::new(),
            tick: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Topology
    // -----------------------------------------------------------------------

    /// Replace the network with an empty `width x height` grid.
    pub fn build_grid(&mut self, width: usize, height: usize) -> Result<(), SimError> {
        self.graph.clear();
        self.grid = Some(GridLayout::build(&mut self.graph, width, height)?);
        tracing::debug!(width, height, "built grid");
        Ok(())
    }

    pub fn grid(&self) -> Option<&GridLayout> {
        self.grid.as_ref()
    }

    /// Node at grid cell `(x, y)`.
    pub fn cell(&self, x: usize, y: usize) -> Result<NodeId, SimError> {
        let grid = self.grid.as_ref().ok_or(GraphError::NoGrid)?;
        Ok(grid.try_cell(x, y)?)
    }

    pub fn set_cell_kind(&mut self, x: usize, y: usize, kind: NodeKind) -> Result<NodeId, SimError> {
        let id = self.cell(x, y)?;
        self.set_kind(id, kind)?;
        Ok(id)
    }

    /// Add a free-standing node sized by the capacity settings.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let capacity = settings::capacity_for(&self.settings, kind);
        self.graph.add_node(kind, capacity)
    }

    pub fn set_kind(&mut self, node: NodeId, kind: NodeKind) -> Result<(), SimError> {
        let capacity = settings::capacity_for(&self.settings, kind);
        self.graph.set_kind(node, kind, capacity)?;
        Ok(())
    }

    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<EdgeId, SimError> {
        Ok(self.graph.connect(a, b)?)
    }

    /// Remove a node and its edges. Grid cells are emptied instead, keeping
    /// the layout intact.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), SimError> {
        let on_grid = self
            .grid
            .as_ref()
            .is_some_and(|g| g.position(node).is_some());
        if on_grid {
            self.set_kind(node, NodeKind::None)
        } else {
            self.graph.remove_node(node)?;
            Ok(())
        }
    }

    /// Set a source's or sink's cycle. Either both values are stored or
    /// neither is.
    pub fn set_node_production(
        &mut self,
        node: NodeId,
        cycle_length: f64,
        batch_size: f64,
    ) -> Result<(), SimError> {
        let state = self
            .graph
            .node_mut(node)
            .ok_or(GraphError::NodeNotFound(node))?
            .production
            .as_mut()
            .ok_or(SimError::NotProducer(node))?;
        let mut config = state.config.clone();
        config.set(CYCLE_LENGTH, cycle_length)?;
        config.set(BATCH_SIZE, batch_size)?;
        state.config = config;
        Ok(())
    }

    /// Drop every node, edge and the grid layout.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.grid = None;
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn node(&self, node: NodeId) -> Option<&Node> {
        self.graph.node(node)
    }

    /// Direct access for seeding content or inspecting production state.
    pub fn node_mut(&mut self, node: NodeId) -> Option<&mut Node> {
        self.graph.node_mut(node)
    }

    /// Pressure at `node` under the active model.
    pub fn pressure_at(&self, node: NodeId) -> Option<f64> {
        self.graph
            .node(node)
            .map(|n| self.pressure_models[self.active_pressure].pressure(n))
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    pub fn settings(&self) -> &ConfigSet {
        &self.settings
    }

    /// Change a global setting. Capacity changes resize existing nodes.
    pub fn set_setting(&mut self, name: &str, value: impl Into<ConfigValue>) -> Result<(), SimError> {
        self.settings.set(name, value)?;
        if name == PIPE_CAPACITY || name == TANK_CAPACITY {
            self.refresh_capacities();
        }
        Ok(())
    }

    /// Apply a batch of settings, returning the rejected entries.
    pub fn apply_settings(&mut self, values: &BTreeMap<String, ConfigValue>) -> Vec<ConfigError> {
        let rejected = self.settings.apply(values);
        self.refresh_capacities();
        rejected
    }

    fn refresh_capacities(&mut self) {
        for node in self.graph.nodes.values_mut() {
            node.capacity = settings::capacity_for(&self.settings, node.kind);
        }
    }

    // -----------------------------------------------------------------------
    // Models
    // -----------------------------------------------------------------------

    /// Queue a pressure model switch for the next tick boundary.
    pub fn select_pressure_model(&mut self, name: &str) -> Result<(), SimError> {
        let index = self
            .pressure_models
            .iter()
            .position(|m| m.name() == name)
            .ok_or_else(|| SimError::UnknownPressureModel(name.to_string()))?;
        self.pending_pressure = Some(index);
        tracing::debug!(model = name, "queued pressure model");
        Ok(())
    }

    /// Queue a clamp model switch for the next tick boundary.
    pub fn select_clamp_model(&mut self, name: &str) -> Result<(), SimError> {
        let index = self
            .clamp_models
            .iter()
            .position(|m| m.name() == name)
            .ok_or_else(|| SimError::UnknownClampModel(name.to_string()))?;
        self.pending_clamp = Some(index);
        tracing::debug!(model = name, "queued clamp model");
        Ok(())
    }

    /// The selected pressure model, including a queued switch.
    pub fn pressure_model_name(&self) -> &'static str {
        self.pressure_models[self.pending_pressure.unwrap_or(self.active_pressure)].name()
    }

    /// The selected clamp model, including a queued switch.
    pub fn clamp_model_name(&self) -> &'static str {
        self.clamp_models[self.pending_clamp.unwrap_or(self.active_clamp)].name()
    }

    /// The pressure model the last tick ran with.
    pub fn active_pressure_model(&self) -> &PressureModel {
        &self.pressure_models[self.active_pressure]
    }

    pub fn active_clamp_model(&self) -> &ClampModel {
        &self.clamp_models[self.active_clamp]
    }

    pub fn pressure_models(&self) -> &[PressureModel] {
        &self.pressure_models
    }

    pub fn clamp_models(&self) -> &[ClampModel] {
        &self.clamp_models
    }

    pub fn pressure_model_mut(&mut self, name: &str) -> Option<&mut PressureModel> {
        self.pressure_models.iter_mut().find(|m| m.name() == name)
    }

    pub fn clamp_model_mut(&mut self, name: &str) -> Option<&mut ClampModel> {
        self.clamp_models.iter_mut().find(|m| m.name() == name)
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    pub fn stats(&self) -> &StatTracker {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut StatTracker {
        &mut self.stats
    }

    /// Ticks run so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    pub fn advance(&mut self, ticks: u64) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        for _ in 0..ticks {
            result.last = Some(self.step());
            result.steps_run += 1;
        }
        result
    }

    /// Run a single tick.
    pub fn step(&mut self) -> TickReport {
        // Phase 1: Snapshot -- previous content, resolved flags, model swaps.
        self.phase_snapshot();
        // Phase 2: Momentum -- pressure and per-edge clamps.
        self.phase_momentum();
        // Phase 3: Fairness -- only for models that ration per node.
        self.phase_fairness();
        // Phase 4: Transport -- commit every move.
        self.phase_transport();
        // Phase 5: Production -- sources and sinks.
        self.phase_production();
        // Phase 6: Accounting -- excursions and flow rates.
        self.phase_accounting();
        // Phase 7: Fold stat frames into running totals.
        self.phase_fold()
    }

    fn phase_snapshot(&mut self) {
        if let Some(index) = self.pending_pressure.take() {
            self.active_pressure = index;
        }
        if let Some(index) = self.pending_clamp.take() {
            self.active_clamp = index;
        }
        for node in self.graph.nodes.values_mut() {
            node.prev_content = node.content;
            if let Some(state) = node.production.as_mut() {
                state.throughput.begin_tick();
            }
        }
        for edge in self.graph.edges.values_mut() {
            edge.resolved = false;
        }
        self.stats.begin_tick();
    }

    fn phase_momentum(&mut self) {
        let pressure = &self.pressure_models[self.active_pressure];
        let clamp = &self.clamp_models[self.active_clamp];
        let FlowGraph {
            nodes,
            edges,
            adjacency,
        } = &mut self.graph;

        for incident in adjacency.values() {
            for &edge_id in incident {
                let Some(edge) = edges.get_mut(edge_id) else {
                    continue;
                };
                if edge.resolved {
                    continue;
                }
                edge.resolved = true;

                let (Some(a), Some(b)) = (nodes.get(edge.a), nodes.get(edge.b)) else {
                    edge.clear_motion();
                    continue;
                };
                if !a.is_present() || !b.is_present() {
                    edge.clear_motion();
                    continue;
                }

                let f = pressure.flow(edge.flow, a, b);
                edge.flow = clamp.clamp(f, ClampPass::FlowSpeed, a, b).value;
                let fluid = clamp.clamp(f, ClampPass::FluidMove, a, b);
                edge.moved = fluid.value;
                self.stats.flow_clamped.add(fluid.policy_clamped);
            }
        }
    }

    fn phase_fairness(&mut self) {
        let clamp = &self.clamp_models[self.active_clamp];
        if clamp.has_fairness_pass() {
            clamp::fairness_pass(&mut self.graph, clamp.resync_flow());
        }
    }

    fn phase_transport(&mut self) {
        let FlowGraph { nodes, edges, .. } = &mut self.graph;
        for edge in edges.values() {
            if edge.moved == 0.0 {
                continue;
            }
            if let Some(a) = nodes.get_mut(edge.a) {
                a.content -= edge.moved;
            }
            if let Some(b) = nodes.get_mut(edge.b) {
                b.content += edge.moved;
            }
        }
    }

    fn phase_production(&mut self) {
        let settings = settings::production_settings(&self.settings);
        for node in self.graph.nodes.values_mut() {
            if node.production.is_some() {
                production::step(node, settings);
            }
        }
    }

    fn phase_accounting(&mut self) {
        let FlowGraph {
            nodes,
            edges,
            adjacency,
        } = &mut self.graph;

        for (id, node) in nodes.iter_mut() {
            if !node.is_present() {
                node.flow_rate = 0.0;
                node.drained = 0.0;
                continue;
            }
            if node.content < 0.0 {
                self.stats.underflow.add(-node.content);
            }
            if node.content > node.capacity {
                self.stats.overflow.add(node.content - node.capacity);
            }
            node.drained = (node.prev_content - node.content).max(0.0);

            let (mut inbound, mut outbound) = (0.0, 0.0);
            for edge in adjacency
                .get(id)
                .into_iter()
                .flatten()
                .filter_map(|e| edges.get(*e))
            {
                let out = edge.outflow_from(id);
                if out > 0.0 {
                    outbound += out;
                } else {
                    inbound -= out;
                }
            }
            node.flow_rate = f64::max(inbound, outbound);
        }
    }

    fn phase_fold(&mut self) -> TickReport {
        self.tick += 1;
        for node in self.graph.nodes.values_mut() {
            if let Some(state) = node.production.as_mut() {
                state.throughput.fold();
            }
        }
        self.stats.fold();

        let report = TickReport {
            tick: self.tick,
            underflow: self.stats.underflow.frame,
            overflow: self.stats.overflow.frame,
            flow_clamped: self.stats.flow_clamped.frame,
            total_content: self.graph.total_content(),
        };
        tracing::trace!(
            tick = report.tick,
            underflow = report.underflow,
            overflow = report.overflow,
            flow_clamped = report.flow_clamped,
            "tick complete"
        );
        report
    }
}

/// Advance several independent networks by `ticks` each.
///
/// With the `parallel` feature the networks run on the rayon pool.
pub fn advance_all(sims: &mut [FlowSimulator], ticks: u64) {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        sims.par_iter_mut().for_each(|sim| {
            sim.advance(ticks);
        });
    }
    #[cfg(not(feature = "parallel"))]
    {
        for sim in sims.iter_mut() {
            sim.advance(ticks);
        }
    }
}
