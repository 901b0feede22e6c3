//! Pipeflow Core -- a pressure-driven flow simulation engine.
//!
//! Content moves between connected storage nodes (pipes, sources, sinks and
//! tanks) under a pluggable pressure model and a pluggable clamp model, one
//! discrete tick at a time.
//!
//! # Seven-Phase Tick
//!
//! Each call to [`sim::FlowSimulator::step`] runs these phases in order. Every
//! phase completes over the whole network before the next begins:
//!
//! 1. **Snapshot** -- Record previous content, clear resolved flags, apply any
//!    queued model switch.
//! 2. **Momentum** -- Per edge: new momentum from the pressure model, then the
//!    `FlowSpeed` and `FluidMove` clamps.
//! 3. **Fairness** -- Per-node rationing, for clamp models that define it.
//! 4. **Transport** -- Commit every edge's move.
//! 5. **Production** -- Source and sink cycles.
//! 6. **Accounting** -- Underflow, overflow and per-node flow rates.
//! 7. **Fold** -- Stat frames into running totals.
//!
//! # Key Types
//!
//! - [`sim::FlowSimulator`] -- Owns a network, its model registries, global
//!   settings and statistics.
//! - [`graph::FlowGraph`] -- Slotmap arena of nodes and edges with adjacency
//!   lists.
//! - [`pressure::PressureModel`] -- Six pressure variants.
//! - [`clamp::ClampModel`] -- Four clamp variants, one with a fairness pass.
//! - [`config::ConfigSet`] -- Named, range-checked parameters.

pub mod clamp;
pub mod config;
pub mod error;
pub mod graph;
pub mod grid;
pub mod id;
pub mod node;
pub mod pressure;
pub mod production;
pub mod settings;
pub mod sim;
pub mod stats;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
