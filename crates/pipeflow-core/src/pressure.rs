//! Pressure models: how node content turns into per-edge momentum.
//!
//! Models use **enum dispatch** over a closed set of variants. Each variant is
//! a pure function of the two endpoint nodes, the edge's carried momentum and
//! the model's own [`ConfigSet`]. Momentum lives on the edge, never in the
//! model.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigItem, ConfigSet};
use crate::node::Node;

pub const C_SQUARED: &str = "c_squared";
pub const FRICTION: &str = "friction";
pub const THRESHOLD: &str = "threshold";
pub const STIFFNESS: &str = "stiffness";
pub const C_SQUARED_DAMPER: &str = "c_squared_damper";
pub const DAMP_FRICTION: &str = "damp_friction";
pub const INERTIA: &str = "inertia";
pub const ACCELERATION: &str = "acceleration";

/// Pressure of a full node under the linear model.
const FULL_PRESSURE: f64 = 100.0;

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PressureKind {
    /// Linear pressure, momentum accelerated by the pressure difference.
    WaveEquation,
    /// Pressure stiffens above a fill threshold.
    NonLinear,
    /// A larger gain while momentum opposes the gradient.
    DampedSignSwitch,
    /// Extra friction on counter-flowing momentum.
    DampedFriction,
    /// Momentum sticks as the source node drains.
    DampedSticky,
    /// Constant acceleration toward lower pressure.
    FixedAcceleration,
}

impl PressureKind {
    pub const ALL: [PressureKind; 6] = [
        PressureKind::WaveEquation,
        PressureKind::NonLinear,
        PressureKind::DampedSignSwitch,
        PressureKind::DampedFriction,
        PressureKind::DampedSticky,
        PressureKind::FixedAcceleration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PressureKind::WaveEquation => "Wave Equation",
            PressureKind::NonLinear => "Non-linear Pressure",
            PressureKind::DampedSignSwitch => "Damped (sign-switch)",
            PressureKind::DampedFriction => "Damped (extra friction)",
            PressureKind::DampedSticky => "Damped (stickiness)",
            PressureKind::FixedAcceleration => "Fixed Acceleration",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PressureKind::WaveEquation => {
                "Pressure is proportional to fill level; momentum follows the discrete wave equation."
            }
            PressureKind::NonLinear => {
                "Like the wave equation, but pressure rises sharply once a node is filled past the threshold."
            }
            PressureKind::DampedSignSwitch => {
                "Uses a stronger gain whenever momentum runs against the pressure gradient."
            }
            PressureKind::DampedFriction => {
                "Applies friction proportional to the gradient when momentum counter-flows."
            }
            PressureKind::DampedSticky => {
                "Slows momentum in proportion to how much the source node drained last tick."
            }
            PressureKind::FixedAcceleration => {
                "Momentum decays by inertia and gains a fixed step toward lower pressure."
            }
        }
    }

    pub fn from_name(name: &str) -> Option<PressureKind> {
        PressureKind::ALL.into_iter().find(|k| k.name() == name)
    }

    /// The parameters this variant reads, at their defaults.
    pub fn default_config(self) -> ConfigSet {
        let c_squared = || ConfigItem::number(0.01, 0.0, 1.0, "Wave speed squared");
        let friction = || ConfigItem::number(0.001, 0.0, 1.0, "Momentum lost per tick");
        match self {
            PressureKind::WaveEquation => ConfigSet::new()
                .with(C_SQUARED, c_squared())
                .with(FRICTION, friction()),
            PressureKind::NonLinear => ConfigSet::new()
                .with(C_SQUARED, c_squared())
                .with(FRICTION, friction())
                .with(
                    THRESHOLD,
                    ConfigItem::number(60.0, 0.0, 100.0, "Fill percentage where pressure stiffens"),
                )
                .with(
                    STIFFNESS,
                    ConfigItem::number(10.0, 1.0, 100.0, "Pressure gain above the threshold"),
                ),
            PressureKind::DampedSignSwitch => ConfigSet::new()
                .with(C_SQUARED, c_squared())
                .with(
                    C_SQUARED_DAMPER,
                    ConfigItem::number(0.05, 0.0, 1.0, "Wave speed squared while decelerating"),
                )
                .with(FRICTION, friction()),
            PressureKind::DampedFriction => ConfigSet::new()
                .with(C_SQUARED, c_squared())
                .with(FRICTION, friction())
                .with(
                    DAMP_FRICTION,
                    ConfigItem::number(0.5, 0.0, 10.0, "Friction per unit of opposing gradient"),
                ),
            PressureKind::DampedSticky => ConfigSet::new()
                .with(C_SQUARED, c_squared())
                .with(FRICTION, friction())
                .with(
                    DAMP_FRICTION,
                    ConfigItem::number(0.05, 0.0, 1.0, "Friction per unit drained from the source"),
                ),
            PressureKind::FixedAcceleration => ConfigSet::new()
                .with(
                    INERTIA,
                    ConfigItem::number(0.95, 0.0, 1.0, "Fraction of momentum kept each tick"),
                )
                .with(
                    ACCELERATION,
                    ConfigItem::number(0.1, 0.0, 10.0, "Momentum added toward lower pressure"),
                ),
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A pressure variant together with its tuned parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureModel {
    pub kind: PressureKind,
    config: ConfigSet,
}

impl PressureModel {
    pub fn new(kind: PressureKind) -> Self {
        Self {
            kind,
            config: kind.default_config(),
        }
    }

    /// One model per variant, in registry order.
    pub fn all() -> Vec<PressureModel> {
        PressureKind::ALL.into_iter().map(PressureModel::new).collect()
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

    /// Pressure at `node`. Zero-capacity nodes have no pressure.
    pub fn pressure(&self, node: &Node) -> f64 {
        if node.capacity <= 0.0 {
            return 0.0;
        }
        let linear = node.content / node.capacity * FULL_PRESSURE;
        match self.kind {
            PressureKind::NonLinear => {
                let threshold = self.config.f64(THRESHOLD);
                if linear <= threshold {
                    linear
                } else {
                    threshold + (linear - threshold) * self.config.f64(STIFFNESS)
                }
            }
            _ => linear,
        }
    }

    /// New momentum for an edge from `a` to `b` currently carrying `flow`.
    pub fn flow(&self, flow: f64, a: &Node, b: &Node) -> f64 {
        let diff = self.pressure(a) - self.pressure(b);
        let cfg = &self.config;
        match self.kind {
            PressureKind::WaveEquation | PressureKind::NonLinear => {
                wave(flow, diff, cfg.f64(C_SQUARED), cfg.f64(FRICTION))
            }
            PressureKind::DampedSignSwitch => {
                let accelerating = sign(flow) == 0.0 || sign(flow) == sign(diff);
                let gain = if accelerating {
                    cfg.f64(C_SQUARED)
                } else {
                    cfg.f64(C_SQUARED_DAMPER)
                };
                wave(flow, diff, gain, cfg.f64(FRICTION))
            }
            PressureKind::DampedFriction => {
                let f = wave(flow, diff, cfg.f64(C_SQUARED), cfg.f64(FRICTION));
                let counter_flow = sign(f) != 0.0 && sign(diff) != 0.0 && sign(f) != sign(diff);
                if counter_flow {
                    f * (1.0 - (cfg.f64(DAMP_FRICTION) * diff.abs() * 0.01).min(0.9))
                } else {
                    f
                }
            }
            PressureKind::DampedSticky => {
                let f = wave(flow, diff, cfg.f64(C_SQUARED), cfg.f64(FRICTION));
                let src = if f > 0.0 {
                    a
                } else if f < 0.0 {
                    b
                } else {
                    return f;
                };
                f * (1.0 - (cfg.f64(DAMP_FRICTION) * src.drained).min(0.5))
            }
            PressureKind::FixedAcceleration => {
                flow * cfg.f64(INERTIA) + sign(diff) * cfg.f64(ACCELERATION)
            }
        }
    }
}

fn wave(flow: f64, diff: f64, c_squared: f64, friction: f64) -> f64 {
    (flow + diff * c_squared) * (1.0 - friction)
}

/// Like `f64::signum` but with `sign(0) == 0`.
pub(crate) fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    fn pipe(content: f64) -> Node {
        let mut n = Node::new(NodeKind::Pipe, 100.0);
        n.content = content;
        n.prev_content = content;
        n
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn names_resolve_back_to_kinds() {
        for kind in PressureKind::ALL {
            assert_eq!(PressureKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PressureKind::from_name("Bernoulli"), None);
    }

    #[test]
    fn zero_capacity_has_no_pressure() {
        let model = PressureModel::new(PressureKind::WaveEquation);
        let hole = Node::new(NodeKind::None, 100.0);
        assert_eq!(model.pressure(&hole), 0.0);
    }

    #[test]
    fn wave_equation_step() {
        let model = PressureModel::new(PressureKind::WaveEquation);
        assert!(close(model.pressure(&pipe(40.0)), 40.0));
        // (0 + 100 * 0.01) * (1 - 0.001)
        let f = model.flow(0.0, &pipe(100.0), &pipe(0.0));
        assert!(close(f, 0.999));
    }

    #[test]
    fn non_linear_pressure_stiffens_above_threshold() {
        let model = PressureModel::new(PressureKind::NonLinear);
        assert!(close(model.pressure(&pipe(50.0)), 50.0));
        assert!(close(model.pressure(&pipe(70.0)), 60.0 + 10.0 * 10.0));
    }

    #[test]
    fn sign_switch_uses_damper_when_decelerating() {
        let model = PressureModel::new(PressureKind::DampedSignSwitch);
        // Momentum toward b, gradient toward a.
        let f = model.flow(1.0, &pipe(0.0), &pipe(10.0));
        assert!(close(f, (1.0 - 10.0 * 0.05) * 0.999));

        // Zero momentum counts as accelerating.
        let f = model.flow(0.0, &pipe(0.0), &pipe(10.0));
        assert!(close(f, -10.0 * 0.01 * 0.999));
    }

    #[test]
    fn extra_friction_only_when_counter_flowing() {
        let model = PressureModel::new(PressureKind::DampedFriction);
        let base = PressureModel::new(PressureKind::WaveEquation);

        let with = model.flow(0.0, &pipe(30.0), &pipe(10.0));
        assert!(close(with, base.flow(0.0, &pipe(30.0), &pipe(10.0))));

        // Strong momentum against a 20-point gradient.
        let f = model.flow(-5.0, &pipe(30.0), &pipe(10.0));
        let raw = (-5.0 + 20.0 * 0.01) * 0.999;
        assert!(close(f, raw * (1.0 - 0.5 * 20.0 * 0.01)));
    }

    #[test]
    fn stickiness_scales_with_source_drain() {
        let model = PressureModel::new(PressureKind::DampedSticky);
        let mut a = pipe(50.0);
        a.drained = 4.0;
        let b = pipe(10.0);
        let raw = (40.0 * 0.01) * 0.999;
        let f = model.flow(0.0, &a, &b);
        assert!(close(f, raw * (1.0 - 0.05 * 4.0)));

        // Large drains cap the damping at one half.
        a.drained = 50.0;
        assert!(close(model.flow(0.0, &a, &b), raw * 0.5));
    }

    #[test]
    fn fixed_acceleration_ignores_gradient_magnitude() {
        let model = PressureModel::new(PressureKind::FixedAcceleration);
        let small = model.flow(1.0, &pipe(11.0), &pipe(10.0));
        let large = model.flow(1.0, &pipe(90.0), &pipe(10.0));
        assert!(close(small, 0.95 + 0.1));
        assert!(close(small, large));
        assert!(close(model.flow(1.0, &pipe(10.0), &pipe(10.0)), 0.95));
    }

    #[test]
    fn config_is_tunable_per_model() {
        let mut model = PressureModel::new(PressureKind::WaveEquation);
        model.config_mut().set(C_SQUARED, 0.5).unwrap();
        assert!(model.config_mut().set(FRICTION, 2.0).is_err());
        assert_eq!(model.config().f64(C_SQUARED), 0.5);
        assert_eq!(model.config().f64(FRICTION), 0.001);
    }
}
