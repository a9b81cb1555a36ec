//! Simulation and layout configuration
//!
//! Every field has a default, so a configuration file only needs to name the
//! values it changes. Files are YAML or JSON, chosen by extension.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::force::{
    DEFAULT_COLLISION_ITERATIONS, DEFAULT_COLLISION_STRENGTH, DEFAULT_LINK_DISTANCE,
    DEFAULT_LINK_ITERATIONS, DEFAULT_STRENGTH, DEFAULT_THETA,
};
use crate::quadtree::QuadTreeConfig;

/// Initial alpha of a fresh (or reheated) simulation
pub const DEFAULT_ALPHA: f64 = 1.0;

/// Alpha at or below which a simulation counts as converged
pub const DEFAULT_MIN_ALPHA: f64 = 0.001;

/// Fraction of velocity kept after each tick
pub const DEFAULT_VELOCITY_DECAY: f64 = 0.6;

/// Number of ticks it takes alpha to fall from 1 to `DEFAULT_MIN_ALPHA`
pub const DEFAULT_ITERATIONS: usize = 300;

/// Upper bound on the ticks of a run to convergence
pub const DEFAULT_MAX_TICKS: usize = 10_000;

/// Default radius for the layout's optional collision force
pub const DEFAULT_COLLISION_RADIUS: f64 = 5.0;

/// Errors in a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A value is outside of its allowed range
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// The file extension is not yaml, yml or json
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file could not be parsed
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Cooling schedule and integration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub alpha: f64,
    pub min_alpha: f64,
    /// Alpha decays toward this value; keep it above `min_alpha` to never converge
    pub alpha_target: f64,
    pub velocity_decay: f64,
    pub iterations: usize,
    /// Seed for the perturbation of zero-length vectors
    pub jiggle_seed: u64,
    pub quadtree: QuadTreeConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            min_alpha: DEFAULT_MIN_ALPHA,
            alpha_target: 0.0,
            velocity_decay: DEFAULT_VELOCITY_DECAY,
            iterations: DEFAULT_ITERATIONS,
            jiggle_seed: 0,
            quadtree: QuadTreeConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.velocity_decay) {
            return Err(invalid("velocity_decay", "must be within [0, 1]"));
        }
        if self.iterations == 0 {
            return Err(invalid("iterations", "must be positive"));
        }
        if !(self.min_alpha > 0.0) {
            return Err(invalid("min_alpha", "must be positive"));
        }
        if !(self.alpha_target >= 0.0) {
            return Err(invalid("alpha_target", "must not be negative"));
        }
        if !self.alpha.is_finite() {
            return Err(invalid("alpha", "must be finite"));
        }
        if self.quadtree.leaf_capacity < 2 {
            return Err(invalid("quadtree.leaf_capacity", "must be at least 2"));
        }
        if self.quadtree.max_depth == 0 {
            return Err(invalid("quadtree.max_depth", "must be positive"));
        }
        Ok(())
    }
}

/// Many-body parameters of a layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManyBodyConfig {
    /// Used for nodes that do not carry their own strength
    pub strength: f64,
    pub theta: f64,
}

impl Default for ManyBodyConfig {
    fn default() -> Self {
        Self {
            strength: DEFAULT_STRENGTH,
            theta: DEFAULT_THETA,
        }
    }
}

/// Link parameters of a layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Used for edges that do not carry their own distance
    pub distance: f64,
    pub iterations: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            distance: DEFAULT_LINK_DISTANCE,
            iterations: DEFAULT_LINK_ITERATIONS,
        }
    }
}

/// Collision parameters of a layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Used for nodes that do not carry their own radius
    pub radius: f64,
    pub iterations: usize,
    pub strength: f64,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_COLLISION_RADIUS,
            iterations: DEFAULT_COLLISION_ITERATIONS,
            strength: DEFAULT_COLLISION_STRENGTH,
        }
    }
}

/// Center of a layout
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterConfig {
    pub x: f64,
    pub y: f64,
}

/// Everything needed to lay out a graph file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub simulation: SimulationConfig,
    pub many_body: ManyBodyConfig,
    pub link: LinkConfig,
    /// Collision is off unless configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collision: Option<CollisionConfig>,
    pub center: CenterConfig,
    pub max_ticks: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            many_body: ManyBodyConfig::default(),
            link: LinkConfig::default(),
            collision: None,
            center: CenterConfig::default(),
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }
}

impl LayoutConfig {
    /// Load a configuration from a `.yaml`, `.yml` or `.json` file
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;
        let content = std::fs::read_to_string(path)?;
        let config: Self = match ext.as_str() {
            "yaml" | "yml" => {
                serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            "json" => {
                serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        config.validate()?;
        debug!(path = %path.display(), "loaded layout config");
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.simulation.validate()?;
        if !(self.many_body.theta >= 0.0) {
            return Err(invalid("many_body.theta", "must not be negative"));
        }
        if !(self.link.distance >= 0.0) {
            return Err(invalid("link.distance", "must not be negative"));
        }
        if let Some(collision) = &self.collision {
            if !(0.0..=1.0).contains(&collision.strength) {
                return Err(invalid("collision.strength", "must be within [0, 1]"));
            }
            if !(collision.radius >= 0.0) {
                return Err(invalid("collision.radius", "must not be negative"));
            }
        }
        if self.max_ticks == 0 {
            return Err(invalid("max_ticks", "must be positive"));
        }
        Ok(())
    }
}
