use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::layout::LayoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplineMode {
    /// Minimum-bend routing through the visibility maze.
    Ortho,
    /// Straight chords between node boundaries; parallel groups fan out as
    /// Bezier curves.
    Line,
    /// Bezier curves for every edge, self-loops included.
    Curved,
}

impl SplineMode {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "ortho" | "orthogonal" => Some(Self::Ortho),
            "line" | "polyline" | "false" => Some(Self::Line),
            "curved" | "spline" | "true" => Some(Self::Curved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrthoConfig {
    /// Distance within which a grid vertex counts as lying on a port line.
    pub port_tolerance: f32,
    /// Axis mismatch above which a head segment is split instead of moved.
    pub axis_tolerance: f32,
    /// Frontier pops allowed per edge before the search gives up.
    pub max_expansions: usize,
}

impl Default for OrthoConfig {
    fn default() -> Self {
        Self {
            port_tolerance: 0.1,
            axis_tolerance: 5.0,
            max_expansions: 500_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_sep: f32,
    pub splines: SplineMode,
    /// Self-loop clearance step as a fraction of `node_sep`.
    pub self_loop_unit_ratio: f32,
    /// Parallel fan spacing as a fraction of `node_sep`.
    pub parallel_spacing_ratio: f32,
    pub ortho: OrthoConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_sep: 18.0,
            splines: SplineMode::Ortho,
            self_loop_unit_ratio: 0.5,
            parallel_spacing_ratio: 0.5,
            ortho: OrthoConfig::default(),
        }
    }
}

impl LayoutConfig {
    pub fn self_loop_unit(&self) -> f32 {
        self.node_sep * self.self_loop_unit_ratio
    }

    pub fn parallel_spacing(&self) -> f32 {
        self.node_sep * self.parallel_spacing_ratio
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        let positive = [
            ("nodeSep", self.node_sep),
            ("selfLoopUnitRatio", self.self_loop_unit_ratio),
            ("parallelSpacingRatio", self.parallel_spacing_ratio),
            ("ortho.portTolerance", self.ortho.port_tolerance),
            ("ortho.axisTolerance", self.ortho.axis_tolerance),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if self.ortho.max_expansions == 0 {
            return Err(LayoutError::InvalidConfig(
                "ortho.maxExpansions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct OrthoConfigFile {
    port_tolerance: Option<f32>,
    axis_tolerance: Option<f32>,
    max_expansions: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    node_sep: Option<f32>,
    splines: Option<String>,
    self_loop_unit_ratio: Option<f32>,
    parallel_spacing_ratio: Option<f32>,
    ortho: Option<OrthoConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let mut config = LayoutConfig::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;

    if let Some(v) = parsed.node_sep {
        config.node_sep = v;
    }
    if let Some(token) = parsed.splines.as_deref() {
        config.splines = SplineMode::from_token(token)
            .ok_or_else(|| anyhow::anyhow!("unknown splines mode: {token}"))?;
    }
    if let Some(v) = parsed.self_loop_unit_ratio {
        config.self_loop_unit_ratio = v;
    }
    if let Some(v) = parsed.parallel_spacing_ratio {
        config.parallel_spacing_ratio = v;
    }
    if let Some(ortho) = parsed.ortho {
        if let Some(v) = ortho.port_tolerance {
            config.ortho.port_tolerance = v;
        }
        if let Some(v) = ortho.axis_tolerance {
            config.ortho.axis_tolerance = v;
        }
        if let Some(v) = ortho.max_expansions {
            config.ortho.max_expansions = v;
        }
    }

    config.validate()?;
    Ok(config)
}
