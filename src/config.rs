//! Engine configuration.
//!
//! All options have defaults, so a YAML file only needs the keys it overrides:
//!
//! ```yaml
//! map_frame_id: odom
//! footprint_vertices: [[0.3, 0.2], [-0.3, 0.2], [-0.3, -0.2], [0.3, -0.2]]
//! step_height_threshold: 0.12
//! filters:
//!   - name: slope
//!     type: slope
//!   - name: traversability
//!     type: weighted_sum
//!     params:
//!       terms:
//!         - { layer: slope, critical: 0.5 }
//! ```

use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::pipeline::StageConfig;
use crate::pipeline::stages::{WeightedSumParams, WeightedTerm};
use crate::types::{
    Footprint, LAYER_ROUGHNESS, LAYER_SLOPE, LAYER_STEP, LAYER_TRAVERSABILITY, TraversabilityError,
};

pub const DEFAULT_STEP_HEIGHT_THRESHOLD: f64 = 0.1;
pub const DEFAULT_SLOPE_THRESHOLD: f64 = 0.3;
pub const DEFAULT_ROUGHNESS_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversabilityConfig {
    /// Frame every ingested raster must be expressed in.
    pub map_frame_id: String,
    pub robot_frame_id: String,
    /// Footprint polygon in the robot frame, `[x, y]` pairs in meters.
    pub footprint_vertices: Vec<[f64; 2]>,
    /// Value substituted for unknown traversability cells.
    #[serde(deserialize_with = "deserialize_unit_interval")]
    pub default_traversability: f64,
    /// Scores below this are reported as not traversable.
    #[serde(deserialize_with = "deserialize_unit_interval")]
    pub traversability_threshold: f64,
    /// Elevation difference (m) that counts as a step.
    pub step_height_threshold: f64,
    /// Lower regions narrower than this (m) are treated as crossable gaps, not steps.
    pub max_gap_width: f64,
    /// Neighborhood radius (m) for step detection. Defaults to 1.5 cells.
    pub step_window_radius: Option<f64>,
    /// Slope angle (rad) above which a cell is steep.
    pub slope_threshold: f64,
    /// Neighborhood radius (m) for slope persistence. Defaults to 3 cells.
    pub slope_window_radius: Option<f64>,
    /// Length (m) of steep terrain that must be present inside the slope window.
    pub slope_critical_length: f64,
    /// Maximum inclination (rad) along a travel segment.
    pub max_incline_angle: f64,
    /// Sample spacing (m) for inclination checks. Defaults to the map resolution.
    pub inclination_sample_spacing: Option<f64>,
    pub roughness_threshold: f64,
    /// Radius (m) of the orientation-invariant footprint layer.
    pub footprint_precompute_radius: f64,
    /// Heading (rad) of the fixed-heading footprint layer built by a full compute.
    pub footprint_yaw: f64,
    /// Raise a geometry error instead of substituting the default for unknown cells.
    pub strict_unknown: bool,
    /// Derivation stages run by `compute_traversability`, in order. When unset,
    /// the chain from [`default_filters`] is built from the thresholds above.
    pub filters: Option<Vec<StageConfig>>,
}

impl Default for TraversabilityConfig {
    fn default() -> Self {
        Self {
            map_frame_id: "map".to_string(),
            robot_frame_id: "base".to_string(),
            footprint_vertices: vec![[0.3, 0.2], [-0.3, 0.2], [-0.3, -0.2], [0.3, -0.2]],
            default_traversability: 0.5,
            traversability_threshold: 0.5,
            step_height_threshold: DEFAULT_STEP_HEIGHT_THRESHOLD,
            max_gap_width: 0.3,
            step_window_radius: None,
            slope_threshold: DEFAULT_SLOPE_THRESHOLD,
            slope_window_radius: None,
            slope_critical_length: 0.1,
            max_incline_angle: 0.5,
            inclination_sample_spacing: None,
            roughness_threshold: DEFAULT_ROUGHNESS_THRESHOLD,
            footprint_precompute_radius: 0.3,
            footprint_yaw: 0.0,
            strict_unknown: false,
            filters: None,
        }
    }
}

impl TraversabilityConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, TraversabilityError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| TraversabilityError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TraversabilityError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn footprint(&self) -> Footprint {
        Footprint::new(
            self.footprint_vertices
                .iter()
                .map(|[x, y]| DVec2::new(*x, *y))
                .collect(),
        )
    }

    pub fn validate(&self) -> Result<(), TraversabilityError> {
        let fail = |msg: String| Err(TraversabilityError::Config(msg));

        if self.footprint_vertices.len() < 3 {
            return fail(format!(
                "footprint needs at least 3 vertices, got {}",
                self.footprint_vertices.len()
            ));
        }
        for (name, value) in [
            ("default_traversability", self.default_traversability),
            ("traversability_threshold", self.traversability_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return fail(format!("{name} must be in [0, 1], got {value}"));
            }
        }
        for (name, value) in [
            ("step_height_threshold", self.step_height_threshold),
            ("slope_threshold", self.slope_threshold),
            ("max_incline_angle", self.max_incline_angle),
            ("roughness_threshold", self.roughness_threshold),
        ] {
            if value.is_nan() || value <= 0.0 {
                return fail(format!("{name} must be positive, got {value}"));
            }
        }
        for (name, value) in [
            ("max_gap_width", Some(self.max_gap_width)),
            ("slope_critical_length", Some(self.slope_critical_length)),
            ("footprint_precompute_radius", Some(self.footprint_precompute_radius)),
            ("step_window_radius", self.step_window_radius),
            ("slope_window_radius", self.slope_window_radius),
            ("inclination_sample_spacing", self.inclination_sample_spacing),
        ] {
            if let Some(value) = value
                && !(value >= 0.0 && value.is_finite())
            {
                return fail(format!("{name} must be a finite non-negative length, got {value}"));
            }
        }
        if self.filters.as_ref().is_some_and(Vec::is_empty) {
            return fail("filter chain is empty".to_string());
        }
        Ok(())
    }

    /// The configured filter chain, or the default chain scored against this
    /// configuration's thresholds.
    pub fn filter_chain(&self) -> Result<Vec<StageConfig>, TraversabilityError> {
        match &self.filters {
            Some(filters) => Ok(filters.clone()),
            None => default_filters(self),
        }
    }
}

/// Stages producing `slope`, `step`, `roughness` and `traversability` from
/// `elevation`. Each term reaches zero at the matching threshold of `config`.
pub fn default_filters(
    config: &TraversabilityConfig,
) -> Result<Vec<StageConfig>, TraversabilityError> {
    let score = StageConfig::new(LAYER_TRAVERSABILITY, "weighted_sum").with_params(
        &WeightedSumParams {
            output: None,
            terms: vec![
                WeightedTerm::new(LAYER_SLOPE, config.slope_threshold),
                WeightedTerm::new(LAYER_STEP, config.step_height_threshold),
                WeightedTerm::new(LAYER_ROUGHNESS, config.roughness_threshold),
            ],
        },
    )?;
    Ok(vec![
        StageConfig::new(LAYER_SLOPE, "slope"),
        StageConfig::new(LAYER_STEP, "step"),
        StageConfig::new(LAYER_ROUGHNESS, "roughness"),
        score,
    ])
}

fn deserialize_unit_interval<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(serde::de::Error::custom("value must be in the range [0.0, 1.0]"))
    }
}
