//! Per-tick accounting for numerical excursions and policy clamping.
//!
//! # Tick lifecycle
//!
//! 1. [`StatEntry::begin_tick`] clears the frame at the start of a tick.
//! 2. [`StatEntry::add`] accumulates into the frame during the tick.
//! 3. [`StatEntry::fold`] adds the frame to the running total at end of tick.
//!
//! The frame stays readable after `fold` until the next tick begins, so a
//! caller that reads after `step()` sees the latest tick's value.

use serde::{Deserialize, Serialize};

/// A single counter: this tick's amount plus a running total for averaging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatEntry {
    /// Amount accumulated during the latest tick.
    pub frame: f64,
    /// Sum of every folded frame since the last reset.
    pub total: f64,
    /// Number of frames folded into `total`.
    pub count: u64,
}

impl StatEntry {
    pub fn begin_tick(&mut self) {
        self.frame = 0.0;
    }

    pub fn add(&mut self, amount: f64) {
        self.frame += amount;
    }

    pub fn fold(&mut self) {
        self.total += self.frame;
        self.count += 1;
    }

    /// Mean per-tick amount, or 0 before anything was folded.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    /// Zero the running total and count. The current frame is kept.
    pub fn reset(&mut self) {
        self.total = 0.0;
        self.count = 0;
    }
}

/// Which tracker entry to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKind {
    Underflow,
    Overflow,
    FlowClamped,
}

/// Network-wide counters owned by the simulator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatTracker {
    /// Amount by which node content dropped below zero.
    pub underflow: StatEntry,
    /// Amount by which node content exceeded capacity.
    pub overflow: StatEntry,
    /// Flow withheld by the clamp policy beyond what physics would clamp.
    pub flow_clamped: StatEntry,
}

impl StatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, kind: StatKind) -> &StatEntry {
        match kind {
            StatKind::Underflow => &self.underflow,
            StatKind::Overflow => &self.overflow,
            StatKind::FlowClamped => &self.flow_clamped,
        }
    }

    pub fn entry_mut(&mut self, kind: StatKind) -> &mut StatEntry {
        match kind {
            StatKind::Underflow => &mut self.underflow,
            StatKind::Overflow => &mut self.overflow,
            StatKind::FlowClamped => &mut self.flow_clamped,
        }
    }

    pub(crate) fn begin_tick(&mut self) {
        self.underflow.begin_tick();
        self.overflow.begin_tick();
        self.flow_clamped.begin_tick();
    }

    pub(crate) fn fold(&mut self) {
        self.underflow.fold();
        self.overflow.fold();
        self.flow_clamped.fold();
    }

    /// Reset one entry's running average.
    pub fn reset(&mut self, kind: StatKind) {
        self.entry_mut(kind).reset();
    }

    pub fn reset_all(&mut self) {
        self.underflow.reset();
        self.overflow.reset();
        self.flow_clamped.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_accumulates_and_keeps_frame_until_next_tick() {
        let mut e = StatEntry::default();
        e.begin_tick();
        e.add(2.0);
        e.add(1.0);
        e.fold();
        assert_eq!(e.frame, 3.0);
        assert_eq!(e.total, 3.0);
        assert_eq!(e.count, 1);

        e.begin_tick();
        assert_eq!(e.frame, 0.0);
        e.add(1.0);
        e.fold();
        assert_eq!(e.total, 4.0);
        assert_eq!(e.average(), 2.0);
    }

    #[test]
    fn average_of_empty_entry_is_zero() {
        assert_eq!(StatEntry::default().average(), 0.0);
    }

    #[test]
    fn reset_zeroes_total_but_not_frame() {
        let mut e = StatEntry::default();
        e.add(5.0);
        e.fold();
        e.reset();
        assert_eq!(e.frame, 5.0);
        assert_eq!(e.total, 0.0);
        assert_eq!(e.count, 0);
    }

    #[test]
    fn tracker_resets_entries_independently() {
        let mut t = StatTracker::new();
        t.underflow.add(1.0);
        t.overflow.add(2.0);
        t.fold();
        t.reset(StatKind::Underflow);
        assert_eq!(t.entry(StatKind::Underflow).count, 0);
        assert_eq!(t.entry(StatKind::Overflow).count, 1);
        assert_eq!(t.entry(StatKind::Overflow).total, 2.0);
    }
}
