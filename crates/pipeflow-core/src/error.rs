//! Error types shared across the simulation core.

use crate::id::{EdgeId, NodeId};

/// Errors raised when writing a [`ConfigItem`](crate::config::ConfigItem).
///
/// All of these are recoverable: the item keeps its previous value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("value {value} for '{name}' is outside [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("'{name}' expects a {expected} value")]
    TypeMismatch { name: String, expected: &'static str },
    #[error("unknown config item '{0}'")]
    UnknownItem(String),
}

/// Errors that can occur during graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("edge not found: {0:?}")]
    EdgeNotFound(EdgeId),
    #[error("cannot connect node {0:?} to itself")]
    SelfLoop(NodeId),
    #[error("no grid layout has been built")]
    NoGrid,
    #[error("grid cell ({x}, {y}) is outside a {width}x{height} layout")]
    CellOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

/// Errors surfaced by the simulator's public API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("unknown pressure model '{0}'")]
    UnknownPressureModel(String),
    #[error("unknown clamp model '{0}'")]
    UnknownClampModel(String),
    #[error("node {0:?} has no production state (not a source or sink)")]
    NotProducer(NodeId),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SimError {
    /// True for the two unknown-model variants.
    pub fn is_unknown_model(&self) -> bool {
        matches!(
            self,
            SimError::UnknownPressureModel(_) | SimError::UnknownClampModel(_)
        )
    }
}
