//! Pipe network example: a source feeding a sink through pipes and a tank.
//!
//! Lays out a small grid, runs it under two model pairings, prints the grid
//! as text along with rolling statistics, and round-trips the network
//! through a RON snapshot.
//!
//! Run with: `cargo run -p pipeflow-examples --example pipe_network`
//! Set `RUST_LOG=pipeflow_core=debug` to see model switches and imports.

use pipeflow_core::node::NodeKind;
use pipeflow_core::settings::SHOW_PRESSURE;
use pipeflow_core::sim::FlowSimulator;
use pipeflow_data::format::{self, Format};
use pipeflow_stats::{Metric, NetworkStats, StatsConfig};
use tracing_subscriber::EnvFilter;

const LAYOUT: [&str; 5] = [
    "S====.....",
    "....=.....",
    "....TT====",
    "....=....=",
    "....=====K",
];

fn build() -> FlowSimulator {
    let mut sim = FlowSimulator::new();
    sim.build_grid(LAYOUT[0].len(), LAYOUT.len()).unwrap();
    for (y, row) in LAYOUT.iter().enumerate() {
        for (x, c) in row.chars().enumerate() {
            let kind = match c {
                'S' => NodeKind::Source,
                'K' => NodeKind::Sink,
                'T' => NodeKind::Tank,
                '=' => NodeKind::Pipe,
                _ => continue,
            };
            sim.set_cell_kind(x, y, kind).unwrap();
        }
    }
    let source = sim.cell(0, 0).unwrap();
    sim.set_node_production(source, 20.0, 80.0).unwrap();
    sim
}

fn render(sim: &FlowSimulator) {
    let show_pressure = sim.settings().flag(SHOW_PRESSURE);
    let grid = sim.grid().unwrap();
    for y in 0..grid.height() {
        let row: Vec<String> = (0..grid.width())
            .map(|x| {
                let id = grid.cell(x, y).unwrap();
                let node = sim.node(id).unwrap();
                if !node.is_present() {
                    return "   .".to_string();
                }
                let value = if show_pressure {
                    sim.pressure_at(id).unwrap_or(0.0)
                } else {
                    node.content
                };
                format!("{value:4.0}")
            })
            .collect();
        println!("  {}", row.join(" "));
    }
}

fn run(sim: &mut FlowSimulator, stats: &mut NetworkStats, ticks: u64) {
    for _ in 0..ticks {
        let report = sim.step();
        stats.record(sim, &report);
    }
}

fn summary(sim: &FlowSimulator, stats: &NetworkStats) {
    let source = sim.cell(0, 0).unwrap();
    let sink = sim.cell(9, 4).unwrap();
    println!(
        "  tick {}: total={:.1} clamped/tick={:.2} underflow/tick={:.3}",
        stats.current_tick(),
        stats.latest(Metric::TotalContent).unwrap_or(0.0),
        stats.rate(Metric::FlowClamped),
        stats.rate(Metric::Underflow),
    );
    println!(
        "  source {:.2}/tick (blocked {:.0}%), sink {:.2}/tick",
        stats.throughput_rate(source),
        stats.blocked_ratio(source) * 100.0,
        stats.throughput_rate(sink),
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut sim = build();
    let mut stats = NetworkStats::new(StatsConfig::default());

    // --- Scenario 1: defaults ---

    println!(
        "=== Scenario 1: {} / {} ===\n",
        sim.pressure_model_name(),
        sim.clamp_model_name()
    );
    for _ in 0..4 {
        run(&mut sim, &mut stats, 100);
        summary(&sim, &stats);
    }
    println!();
    render(&sim);

    // --- Scenario 2: switch models mid-run ---

    sim.select_pressure_model("Damped (extra friction)").unwrap();
    sim.select_clamp_model("Contested Ratio Clamping").unwrap();
    println!(
        "\n=== Scenario 2: {} / {} ===\n",
        sim.pressure_model_name(),
        sim.clamp_model_name()
    );
    for _ in 0..4 {
        run(&mut sim, &mut stats, 100);
        summary(&sim, &stats);
    }
    sim.set_setting(SHOW_PRESSURE, true).unwrap();
    println!("\n  pressure:");
    render(&sim);

    // --- Scenario 3: snapshot round trip ---

    println!("\n=== Scenario 3: snapshot ===\n");
    let snapshot = pipeflow_data::export(&sim).unwrap();
    let text = format::to_string(&snapshot, Format::Ron).unwrap();
    println!("  RON snapshot is {} bytes", text.len());

    let mut copy = FlowSimulator::new();
    let parsed = format::from_str(&text, Format::Ron, "memory").unwrap();
    let report = pipeflow_data::import(&mut copy, &parsed).unwrap();
    println!(
        "  imported {}x{} grid, clean={}, models {} / {}",
        copy.grid().unwrap().width(),
        copy.grid().unwrap().height(),
        report.is_clean(),
        copy.pressure_model_name(),
        copy.clamp_model_name()
    );
}
