//! Statistics history for pipeflow networks.
//!
//! [`NetworkStats`] samples a [`FlowSimulator`] after every tick and keeps
//! rolling averages and bounded history for the network-wide stat frames and
//! for each source's and sink's throughput.
//!
//! # Usage
//!
//! ```ignore
//! let mut stats = NetworkStats::new(StatsConfig::default());
//! let report = sim.step();
//! stats.record(&sim, &report);
//! let clamped = stats.rate(Metric::FlowClamped);
//! ```

use std::collections::{HashMap, HashSet};

use pipeflow_core::id::NodeId;
use pipeflow_core::sim::{FlowSimulator, TickReport};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Window size in ticks for rolling averages.
    pub window_size: usize,
    /// Maximum number of historical samples kept per metric.
    pub history_capacity: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_size: 60,
            history_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer of samples. When full, the oldest entry is
/// overwritten. Iterates oldest-to-newest.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<f64>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            data: vec![0.0; capacity],
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.data[self.head] = value;
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn latest(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.capacity() - 1) % self.capacity();
        Some(self.data[idx])
    }

    /// Values from oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        (0..self.len).map(move |i| self.data[(start + i) % self.capacity()])
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// Rolling window
// ---------------------------------------------------------------------------

/// Sum and mean over the most recent `window_size` committed ticks.
///
/// Call [`add`](Self::add) during a tick and [`commit`](Self::commit) exactly
/// once at its end.
#[derive(Debug, Clone)]
struct RollingWindow {
    samples: RingBuffer,
    current: f64,
}

impl RollingWindow {
    fn new(window_size: usize) -> Self {
        Self {
            samples: RingBuffer::new(window_size),
            current: 0.0,
        }
    }

    fn add(&mut self, amount: f64) {
        self.current += amount;
    }

    fn commit(&mut self) {
        self.samples.push(self.current);
        self.current = 0.0;
    }

    fn total(&self) -> f64 {
        self.samples.iter().sum()
    }

    /// Mean per committed tick, 0 before the first commit.
    fn rate(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.total() / self.samples.len() as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Network-wide quantities sampled from each [`TickReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    TotalContent,
    Underflow,
    Overflow,
    FlowClamped,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::TotalContent,
        Metric::Underflow,
        Metric::Overflow,
        Metric::FlowClamped,
    ];

    fn read(self, report: &TickReport) -> f64 {
        match self {
            Metric::TotalContent => report.total_content,
            Metric::Underflow => report.underflow,
            Metric::Overflow => report.overflow,
            Metric::FlowClamped => report.flow_clamped,
        }
    }
}

#[derive(Debug, Clone)]
struct MetricSeries {
    window: RollingWindow,
    history: RingBuffer,
}

impl MetricSeries {
    fn new(config: &StatsConfig) -> Self {
        Self {
            window: RollingWindow::new(config.window_size),
            history: RingBuffer::new(config.history_capacity),
        }
    }

    fn record(&mut self, value: f64) {
        self.window.add(value);
        self.window.commit();
        self.history.push(value);
    }
}

/// Throughput and stall tracking for one source or sink.
#[derive(Debug, Clone)]
struct ProducerStats {
    throughput: RollingWindow,
    blocked: RollingWindow,
    /// Rolling throughput rate after each tick.
    history: RingBuffer,
}

impl ProducerStats {
    fn new(config: &StatsConfig) -> Self {
        Self {
            throughput: RollingWindow::new(config.window_size),
            blocked: RollingWindow::new(config.window_size),
            history: RingBuffer::new(config.history_capacity),
        }
    }
}

// ---------------------------------------------------------------------------
// NetworkStats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NetworkStats {
    config: StatsConfig,
    current_tick: u64,
    metrics: HashMap<Metric, MetricSeries>,
    producers: HashMap<NodeId, ProducerStats>,
}

impl NetworkStats {
    pub fn new(config: StatsConfig) -> Self {
        let metrics = Metric::ALL
            .into_iter()
            .map(|m| (m, MetricSeries::new(&config)))
            .collect();
        Self {
            config,
            current_tick: 0,
            metrics,
            producers: HashMap::new(),
        }
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Tick of the last recorded report.
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Sample the simulator after a tick. Nodes that stopped being sources or
    /// sinks are dropped.
    pub fn record(&mut self, sim: &FlowSimulator, report: &TickReport) {
        self.current_tick = report.tick;
        for (metric, series) in self.metrics.iter_mut() {
            series.record(metric.read(report));
        }

        let mut seen = HashSet::new();
        for (id, node) in sim.graph().nodes() {
            let Some(state) = node.production.as_ref() else {
                continue;
            };
            let config = &self.config;
            let entry = self
                .producers
                .entry(id)
                .or_insert_with(|| ProducerStats::new(config));
            entry.throughput.add(state.throughput.frame);
            entry.throughput.commit();
            entry.blocked.add(if state.blocked { 1.0 } else { 0.0 });
            entry.blocked.commit();
            entry.history.push(entry.throughput.rate());
            seen.insert(id);
        }
        self.producers.retain(|id, _| seen.contains(id));
    }

    /// Value from the latest recorded tick.
    pub fn latest(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).and_then(|s| s.history.latest())
    }

    /// Mean per tick over the rolling window.
    pub fn rate(&self, metric: Metric) -> f64 {
        self.metrics.get(&metric).map_or(0.0, |s| s.window.rate())
    }

    /// Sum over the rolling window.
    pub fn window_total(&self, metric: Metric) -> f64 {
        self.metrics.get(&metric).map_or(0.0, |s| s.window.total())
    }

    /// Recorded values, oldest first.
    pub fn history(&self, metric: Metric) -> Vec<f64> {
        self.metrics
            .get(&metric)
            .map(|s| s.history.to_vec())
            .unwrap_or_default()
    }

    /// Mean amount a source produced or a sink consumed per tick.
    pub fn throughput_rate(&self, node: NodeId) -> f64 {
        self.producers.get(&node).map_or(0.0, |p| p.throughput.rate())
    }

    /// Fraction of recent ticks on which the node was blocked.
    pub fn blocked_ratio(&self, node: NodeId) -> f64 {
        self.producers.get(&node).map_or(0.0, |p| p.blocked.rate())
    }

    pub fn throughput_history(&self, node: NodeId) -> Vec<f64> {
        self.producers
            .get(&node)
            .map(|p| p.history.to_vec())
            .unwrap_or_default()
    }

    pub fn tracked_node_count(&self) -> usize {
        self.producers.len()
    }

    pub fn clear(&mut self) {
        for series in self.metrics.values_mut() {
            *series = MetricSeries::new(&self.config);
        }
        self.producers.clear();
        self.current_tick = 0;
    }
}

impl Default for NetworkStats {
    fn default() -> Self {
        Self::new(StatsConfig::default())
    }
}
