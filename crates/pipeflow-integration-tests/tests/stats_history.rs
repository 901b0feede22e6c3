//! Integration test: rolling statistics over a running network.

use pipeflow_core::node::NodeKind;
use pipeflow_core::settings::BUFFER_MULTIPLIER;
use pipeflow_core::sim::FlowSimulator;
use pipeflow_core::test_utils::*;
use pipeflow_stats::{Metric, NetworkStats, StatsConfig};

fn run(sim: &mut FlowSimulator, stats: &mut NetworkStats, ticks: u64) {
    for _ in 0..ticks {
        let report = sim.step();
        stats.record(sim, &report);
    }
}

#[test]
fn producer_rate_matches_lifetime_average_inside_window() {
    let (mut sim, source, sink) = source_to_sink(5);
    sim.set_node_production(source, 4.0, 12.0).unwrap();
    let mut stats = NetworkStats::new(StatsConfig::default());

    run(&mut sim, &mut stats, 40);

    assert_eq!(stats.current_tick(), 40);
    assert_eq!(stats.tracked_node_count(), 2);
    let state = sim.node(source).unwrap().production.as_ref().unwrap();
    assert!(state.throughput.total > 0.0);
    assert_close(stats.throughput_rate(source), state.throughput.average(), 1e-9);
    assert_eq!(stats.throughput_history(source).len(), 40);
    assert!(stats.throughput_rate(sink) >= 0.0);
}

#[test]
fn isolated_source_reports_blocked() {
    let mut sim = FlowSimulator::new();
    sim.build_grid(1, 1).unwrap();
    sim.set_setting(BUFFER_MULTIPLIER, 1.0).unwrap();
    let source = sim.set_cell_kind(0, 0, NodeKind::Source).unwrap();
    sim.set_node_production(source, 5.0, 100.0).unwrap();

    let mut stats = NetworkStats::new(StatsConfig {
        window_size: 20,
        history_capacity: 32,
    });
    run(&mut sim, &mut stats, 100);

    assert!(sim.node(source).unwrap().production.as_ref().unwrap().blocked);
    assert_eq!(stats.blocked_ratio(source), 1.0);
    assert_eq!(stats.throughput_rate(source), 0.0);
}

#[test]
fn history_is_bounded_and_tracks_latest_report() {
    let mut sim = patterned_grid(6, 6);
    let mut stats = NetworkStats::new(StatsConfig {
        window_size: 5,
        history_capacity: 8,
    });

    let mut last = None;
    for _ in 0..20 {
        let report = sim.step();
        stats.record(&sim, &report);
        last = Some(report);
    }
    let last = last.unwrap();

    let history = stats.history(Metric::TotalContent);
    assert_eq!(history.len(), 8);
    assert_eq!(stats.latest(Metric::TotalContent), Some(last.total_content));
    assert_eq!(*history.last().unwrap(), last.total_content);
    assert_close(
        stats.rate(Metric::TotalContent),
        stats.window_total(Metric::TotalContent) / 5.0,
        1e-9,
    );
    assert_eq!(stats.latest(Metric::Underflow), Some(0.0));
}

#[test]
fn producers_that_change_kind_are_dropped() {
    let (mut sim, source, sink) = source_to_sink(4);
    let mut stats = NetworkStats::new(StatsConfig::default());
    run(&mut sim, &mut stats, 10);
    assert_eq!(stats.tracked_node_count(), 2);

    sim.set_kind(source, NodeKind::Pipe).unwrap();
    run(&mut sim, &mut stats, 1);
    assert_eq!(stats.tracked_node_count(), 1);
    assert_eq!(stats.throughput_rate(source), 0.0);
    assert!(stats.throughput_history(source).is_empty());

    sim.remove_node(sink).unwrap();
    run(&mut sim, &mut stats, 1);
    assert_eq!(stats.tracked_node_count(), 0);

    stats.clear();
    assert!(stats.history(Metric::TotalContent).is_empty());
}
