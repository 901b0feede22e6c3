//! Integration test: end-to-end flow scenarios.
//!
//! Drives whole networks through many ticks using only the public API and
//! checks the observable behaviour: bounded transfers, batch timing,
//! production accounting and stability of every model pairing.

use pipeflow_core::clamp::ClampKind;
use pipeflow_core::node::NodeKind;
use pipeflow_core::pressure::{C_SQUARED, FRICTION, PressureKind};
use pipeflow_core::settings::{BUFFER_MULTIPLIER, SMOOTH_PRODUCTION};
use pipeflow_core::sim::{FlowSimulator, advance_all};
use pipeflow_core::stats::StatKind;
use pipeflow_core::test_utils::*;

#[test]
fn line_of_three_under_quarter_limit() {
    let (mut sim, ids) = line_of_pipes(3);
    {
        let wave = sim.pressure_model_mut("Wave Equation").unwrap();
        wave.config_mut().set(C_SQUARED, 0.01).unwrap();
        wave.config_mut().set(FRICTION, 0.001).unwrap();
    }
    sim.select_clamp_model("Quarter Limit").unwrap();
    sim.node_mut(ids[0]).unwrap().content = 100.0;

    sim.step();

    let drop = 100.0 - sim.node(ids[0]).unwrap().content;
    assert!(drop > 0.0);
    assert!(drop <= 25.0);
    assert_close(sim.node(ids[1]).unwrap().content, drop, 1e-12);
    assert_eq!(sim.node(ids[2]).unwrap().content, 0.0);
}

#[test]
fn unsmoothed_source_releases_a_full_batch_after_sixty_ticks() {
    let mut sim = FlowSimulator::new();
    sim.build_grid(2, 1).unwrap();
    sim.set_setting(BUFFER_MULTIPLIER, 1.0).unwrap();
    sim.set_setting(SMOOTH_PRODUCTION, false).unwrap();
    let source = sim.set_cell_kind(0, 0, NodeKind::Source).unwrap();
    let pipe = sim.set_cell_kind(1, 0, NodeKind::Pipe).unwrap();
    sim.set_node_production(source, 60.0, 100.0).unwrap();

    let result = sim.advance(60);
    assert_eq!(result.steps_run, 60);
    let buffer = sim.node(source).unwrap().production.as_ref().unwrap().buffer;
    assert_eq!(buffer, 100.0);

    sim.step();
    let node = sim.node(source).unwrap();
    let state = node.production.as_ref().unwrap();
    assert_eq!(state.throughput.frame, 100.0);
    assert_eq!(state.buffer, 0.0);
    assert_eq!(node.content, 100.0);
    assert_eq!(sim.node(pipe).unwrap().content, 0.0);

    // Unclamped momentum drains the full batch into the empty pipe in one tick.
    sim.select_clamp_model("Contested Ratio Clamping").unwrap();
    sim.pressure_model_mut("Wave Equation")
        .unwrap()
        .config_mut()
        .set(C_SQUARED, 1.0)
        .unwrap();
    sim.pressure_model_mut("Wave Equation")
        .unwrap()
        .config_mut()
        .set(FRICTION, 0.0)
        .unwrap();
    sim.step();
    assert_eq!(sim.node(pipe).unwrap().content, 100.0);
    assert_eq!(sim.node(source).unwrap().content, 0.0);
}

#[test]
fn smoothed_source_spreads_release() {
    let mut sim = FlowSimulator::new();
    sim.build_grid(2, 1).unwrap();
    sim.set_setting(SMOOTH_PRODUCTION, true).unwrap();
    let source = sim.set_cell_kind(0, 0, NodeKind::Source).unwrap();
    sim.set_cell_kind(1, 0, NodeKind::Pipe).unwrap();
    sim.set_node_production(source, 10.0, 50.0).unwrap();

    sim.advance(11);
    let released = sim
        .node(source)
        .unwrap()
        .production
        .as_ref()
        .unwrap()
        .throughput
        .frame;
    assert_close(released, 50.0 / 10.0, 1e-9);
}

#[test]
fn content_equals_produced_minus_consumed() {
    let (mut sim, source, sink) = source_to_sink(6);
    sim.set_node_production(source, 5.0, 20.0).unwrap();
    sim.set_node_production(sink, 5.0, 10.0).unwrap();

    for _ in 0..2000 {
        sim.step();
    }

    let produced = sim.node(source).unwrap().production.as_ref().unwrap().throughput.total;
    let consumed = sim.node(sink).unwrap().production.as_ref().unwrap().throughput.total;
    assert!(produced > 0.0);
    assert!(consumed > 0.0, "nothing reached the sink");
    assert_close(sim.graph().total_content(), produced - consumed, 1e-6 * produced);
    assert_eq!(sim.stats().entry(StatKind::Underflow).total, 0.0);
}

#[test]
fn every_model_pairing_stays_finite() {
    for pressure in PressureKind::ALL {
        for clamp in ClampKind::ALL {
            let mut sim = patterned_grid(6, 5);
            sim.select_pressure_model(pressure.name()).unwrap();
            sim.select_clamp_model(clamp.name()).unwrap();
            let before = sim.graph().total_content();

            for _ in 0..100 {
                let report = sim.step();
                assert!(
                    report.total_content.is_finite(),
                    "{} / {} diverged",
                    pressure.name(),
                    clamp.name()
                );
            }
            if clamp != ClampKind::Overcommit {
                assert_close(sim.graph().total_content(), before, 1e-6 * before);
                assert!(sim.stats().underflow.total < 1e-6);
                assert!(sim.stats().overflow.total < 1e-6);
            }
        }
    }
}

#[test]
fn switching_models_mid_run_keeps_network_state() {
    let mut sim = patterned_grid(5, 5);
    sim.advance(20);
    let content = sim.graph().total_content();
    let momentum: Vec<f64> = sim.graph().edges().map(|(_, e)| e.flow).collect();

    sim.select_pressure_model("Damped (sign-switch)").unwrap();
    sim.select_clamp_model("Connection Count Limit").unwrap();
    let after: Vec<f64> = sim.graph().edges().map(|(_, e)| e.flow).collect();
    assert_eq!(momentum, after, "selection alone must not touch edges");
    assert_eq!(sim.active_pressure_model().name(), "Wave Equation");

    sim.advance(20);
    assert_eq!(sim.active_clamp_model().name(), "Connection Count Limit");
    assert_close(sim.graph().total_content(), content, 1e-6 * content);
}

#[test]
fn stat_reset_keeps_latest_frame() {
    let (mut sim, ids) = line_of_pipes(2);
    sim.pressure_model_mut("Wave Equation")
        .unwrap()
        .config_mut()
        .set(C_SQUARED, 1.0)
        .unwrap();
    sim.node_mut(ids[0]).unwrap().content = 100.0;
    let report = sim.step();
    assert!(report.flow_clamped > 0.0);

    sim.stats_mut().reset(StatKind::FlowClamped);
    let entry = sim.stats().entry(StatKind::FlowClamped);
    assert_eq!(entry.count, 0);
    assert_eq!(entry.total, 0.0);
    assert_eq!(entry.frame, report.flow_clamped);
}

#[test]
fn independent_networks_advance_together() {
    let mut sims: Vec<FlowSimulator> = (0..4).map(|_| patterned_grid(4, 4)).collect();
    let totals: Vec<f64> = sims.iter().map(|s| s.graph().total_content()).collect();

    advance_all(&mut sims, 25);

    for (sim, before) in sims.iter().zip(totals) {
        assert_eq!(sim.tick(), 25);
        assert_close(sim.graph().total_content(), before, 1e-6 * before.max(1.0));
    }
}
