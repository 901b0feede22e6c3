//! Network-wide settings.

use crate::config::{ConfigItem, ConfigSet};
use crate::node::NodeKind;
use crate::production::ProductionSettings;

pub const SMOOTH_PRODUCTION: &str = "smooth_production";
pub const BUFFER_MULTIPLIER: &str = "buffer_multiplier";
pub const PIPE_CAPACITY: &str = "pipe_capacity";
pub const TANK_CAPACITY: &str = "tank_capacity";
pub const SHOW_PRESSURE: &str = "show_pressure";

pub fn default_settings() -> ConfigSet {
    ConfigSet::new()
        .with(
            SMOOTH_PRODUCTION,
            ConfigItem::flag(false, "Spread each batch over the remaining cycle"),
        )
        .with(
            BUFFER_MULTIPLIER,
            ConfigItem::number(2.0, 1.0, 10.0, "Batches a source or sink may stage"),
        )
        .with(
            PIPE_CAPACITY,
            ConfigItem::number(100.0, 1.0, 1e6, "Capacity of pipes, sources and sinks"),
        )
        .with(
            TANK_CAPACITY,
            ConfigItem::number(1000.0, 1.0, 1e7, "Capacity of tanks"),
        )
        .with(
            SHOW_PRESSURE,
            ConfigItem::flag(false, "Display pressure instead of content"),
        )
}

/// Capacity a node of `kind` gets under `settings`.
pub fn capacity_for(settings: &ConfigSet, kind: NodeKind) -> f64 {
    match kind {
        NodeKind::None => 0.0,
        NodeKind::Pipe | NodeKind::Source | NodeKind::Sink => settings.f64(PIPE_CAPACITY),
        NodeKind::Tank => settings.f64(TANK_CAPACITY),
    }
}

pub fn production_settings(settings: &ConfigSet) -> ProductionSettings {
    ProductionSettings {
        smoothing: settings.flag(SMOOTH_PRODUCTION),
        buffer_multiplier: settings.f64(BUFFER_MULTIPLIER),
    }
}
