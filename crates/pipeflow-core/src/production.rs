//! Batch production and consumption for source and sink nodes.
//!
//! A source completes a batch every `cycle_length` ticks into a staging
//! buffer and releases the buffer into its own content as room allows. A
//! sink does the reverse. Each tick the transfer runs before the cycle
//! advances, so a batch finished on tick N first moves on tick N+1.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigItem, ConfigSet};
use crate::node::{Node, NodeKind};
use crate::stats::StatEntry;

pub const CYCLE_LENGTH: &str = "cycle_length";
pub const BATCH_SIZE: &str = "batch_size";

pub const DEFAULT_CYCLE_LENGTH: f64 = 60.0;
pub const DEFAULT_BATCH_SIZE: f64 = 100.0;

/// Per-node cycle settings with their allowed ranges.
pub fn default_production_config() -> ConfigSet {
    ConfigSet::new()
        .with(
            CYCLE_LENGTH,
            ConfigItem::number(DEFAULT_CYCLE_LENGTH, 1.0, 100_000.0, "Ticks per batch cycle"),
        )
        .with(
            BATCH_SIZE,
            ConfigItem::number(DEFAULT_BATCH_SIZE, 0.0, 1_000_000.0, "Amount per batch"),
        )
}

/// Global knobs the production step reads each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductionSettings {
    /// Spread each batch over the remaining cycle ticks.
    pub smoothing: bool,
    /// Buffer holds up to `buffer_multiplier` batches.
    pub buffer_multiplier: f64,
}

/// Production/consumption state carried by sources and sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionState {
    pub config: ConfigSet,
    /// Ticks into the current cycle.
    pub progress: u32,
    /// Staged amount between cycle completion and pipe transfer.
    pub buffer: f64,
    /// The last cycle completed but the buffer could not advance.
    pub blocked: bool,
    pub throughput: StatEntry,
}

impl Default for ProductionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductionState {
    pub fn new() -> Self {
        Self {
            config: default_production_config(),
            progress: 0,
            buffer: 0.0,
            blocked: false,
            throughput: StatEntry::default(),
        }
    }

    pub fn cycle_length(&self) -> u32 {
        self.config.f64(CYCLE_LENGTH).round().max(1.0) as u32
    }

    pub fn batch_size(&self) -> f64 {
        self.config.f64(BATCH_SIZE)
    }

    /// True when both cycle settings still hold their defaults.
    pub fn has_default_config(&self) -> bool {
        self.config == default_production_config()
    }

    fn remaining_ticks(&self) -> f64 {
        self.cycle_length().saturating_sub(self.progress).max(1) as f64
    }
}

/// Run one tick of production (sources) or consumption (sinks) for `node`.
/// Returns the amount moved between buffer and content.
pub(crate) fn step(node: &mut Node, settings: ProductionSettings) -> f64 {
    let kind = node.kind;
    let Node {
        content,
        capacity,
        production,
        ..
    } = node;
    let Some(state) = production.as_mut() else {
        return 0.0;
    };

    match kind {
        NodeKind::Source => step_source(state, content, *capacity, settings),
        NodeKind::Sink => step_sink(state, content, settings),
        _ => 0.0,
    }
}

fn step_source(
    state: &mut ProductionState,
    content: &mut f64,
    capacity: f64,
    settings: ProductionSettings,
) -> f64 {
    let release = if settings.smoothing {
        state.buffer / state.remaining_ticks()
    } else {
        state.buffer
    };
    let moved = release.min(capacity - *content).max(0.0);
    *content += moved;
    state.buffer -= moved;
    state.throughput.add(moved);

    let cycle = state.cycle_length();
    state.progress = (state.progress + 1).min(cycle);
    if state.progress >= cycle {
        let batch = state.batch_size();
        if state.buffer <= (settings.buffer_multiplier - 1.0) * batch {
            state.buffer += batch;
            state.progress = 0;
            state.blocked = false;
        } else {
            state.blocked = true;
        }
    }
    moved
}

fn step_sink(state: &mut ProductionState, content: &mut f64, settings: ProductionSettings) -> f64 {
    let batch = state.batch_size();
    let room = settings.buffer_multiplier * batch - state.buffer;
    let draw = if settings.smoothing {
        room / state.remaining_ticks()
    } else {
        room
    };
    let moved = draw.min(*content).max(0.0);
    *content -= moved;
    state.buffer += moved;
    state.throughput.add(moved);

    let cycle = state.cycle_length();
    state.progress = (state.progress + 1).min(cycle);
    if state.progress >= cycle {
        if state.buffer >= batch {
            state.buffer -= batch;
            state.progress = 0;
            state.blocked = false;
        } else {
            state.blocked = true;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(smoothing: bool, buffer_multiplier: f64) -> ProductionSettings {
        ProductionSettings {
            smoothing,
            buffer_multiplier,
        }
    }

    fn source(cycle: f64, batch: f64) -> Node {
        let mut node = Node::new(NodeKind::Source, 100.0);
        let state = node.production.as_mut().unwrap();
        state.config.set(CYCLE_LENGTH, cycle).unwrap();
        state.config.set(BATCH_SIZE, batch).unwrap();
        node
    }

    fn sink(cycle: f64, batch: f64) -> Node {
        let mut node = Node::new(NodeKind::Sink, 100.0);
        let state = node.production.as_mut().unwrap();
        state.config.set(CYCLE_LENGTH, cycle).unwrap();
        state.config.set(BATCH_SIZE, batch).unwrap();
        node
    }

    #[test]
    fn source_fills_buffer_after_full_cycle() {
        let mut node = source(60.0, 100.0);
        for _ in 0..59 {
            step(&mut node, settings(false, 1.0));
        }
        assert_eq!(node.production.as_ref().unwrap().buffer, 0.0);
        step(&mut node, settings(false, 1.0));
        let state = node.production.as_ref().unwrap();
        assert_eq!(state.buffer, 100.0);
        assert_eq!(state.progress, 0);
        assert_eq!(node.content, 0.0, "batch is released on the following tick");
    }

    #[test]
    fn unsmoothed_source_releases_whole_batch_at_once() {
        let mut node = source(5.0, 40.0);
        for _ in 0..5 {
            step(&mut node, settings(false, 1.0));
        }
        let moved = step(&mut node, settings(false, 1.0));
        assert_eq!(moved, 40.0);
        assert_eq!(node.content, 40.0);
    }

    #[test]
    fn source_release_is_bounded_by_free_space() {
        let mut node = source(1.0, 100.0);
        node.content = 70.0;
        step(&mut node, settings(false, 2.0));
        let moved = step(&mut node, settings(false, 2.0));
        assert_eq!(moved, 30.0);
        assert_eq!(node.content, 100.0);
        // 70 left in the buffer; cycle completed again since 70 <= (2-1)*100.
        assert_eq!(node.production.as_ref().unwrap().buffer, 170.0);
    }

    #[test]
    fn source_stalls_when_buffer_is_full() {
        let mut node = source(2.0, 50.0);
        node.content = 100.0; // nothing can be released
        let s = settings(false, 1.0);
        step(&mut node, s);
        step(&mut node, s); // first batch
        step(&mut node, s);
        step(&mut node, s); // second cycle completes, buffer 50 > 0
        let state = node.production.as_ref().unwrap();
        assert!(state.blocked);
        assert_eq!(state.buffer, 50.0);
        assert_eq!(state.progress, 2, "progress holds at cycle length while blocked");
    }

    #[test]
    fn smoothed_source_spreads_batch_over_cycle() {
        let mut node = source(4.0, 40.0);
        let s = settings(true, 1.0);
        for _ in 0..4 {
            step(&mut node, s);
        }
        // Buffer 40 with progress 0: remaining 4 ticks -> 10 per tick.
        let moved = step(&mut node, s);
        assert!((moved - 10.0).abs() < 1e-9);
    }

    #[test]
    fn sink_draws_up_to_buffer_capacity() {
        let mut node = sink(10.0, 30.0);
        node.content = 100.0;
        let moved = step(&mut node, settings(false, 2.0));
        assert_eq!(moved, 60.0);
        assert_eq!(node.content, 40.0);
    }

    #[test]
    fn smoothed_sink_spreads_draw_over_cycle() {
        let mut node = sink(4.0, 40.0);
        node.content = 100.0;
        let s = settings(true, 1.0);
        // Room 40 over 4 remaining ticks.
        let moved = step(&mut node, s);
        assert!((moved - 10.0).abs() < 1e-9);
        assert!((node.content - 90.0).abs() < 1e-9);
        // Room 30 over 3 remaining ticks.
        assert!((step(&mut node, s) - 10.0).abs() < 1e-9);
        assert_eq!(node.production.as_ref().unwrap().progress, 2);
    }

    #[test]
    fn sink_consumes_batch_on_cycle_completion() {
        let mut node = sink(2.0, 30.0);
        node.content = 100.0;
        let s = settings(false, 1.0);
        step(&mut node, s);
        step(&mut node, s);
        let state = node.production.as_ref().unwrap();
        assert_eq!(state.buffer, 0.0);
        assert_eq!(state.progress, 0);
        assert!(!state.blocked);
    }

    #[test]
    fn sink_blocks_when_starved() {
        let mut node = sink(1.0, 30.0);
        node.content = 10.0;
        step(&mut node, settings(false, 1.0));
        let state = node.production.as_ref().unwrap();
        assert!(state.blocked);
        assert_eq!(state.buffer, 10.0);
        assert_eq!(node.content, 0.0);
    }

    #[test]
    fn sink_never_draws_from_negative_content() {
        let mut node = sink(5.0, 30.0);
        node.content = -2.0;
        let moved = step(&mut node, settings(false, 1.0));
        assert_eq!(moved, 0.0);
        assert_eq!(node.content, -2.0);
    }

    #[test]
    fn pipes_are_ignored() {
        let mut node = Node::new(NodeKind::Pipe, 100.0);
        assert_eq!(step(&mut node, settings(false, 1.0)), 0.0);
    }
}
