//! Built-in derivation stages.
//!
//! Every stage writes to `output`, which defaults to the stage name, and leaves
//! cells unknown where its input is unknown.

use glam::UVec2;
use serde::{Deserialize, Serialize};

use crate::grid::{Grid2d, RasterMap};
use crate::iterators::AnnulusIterator;
use crate::pipeline::{Stage, StageConfig};
use crate::types::{LAYER_ELEVATION, TraversabilityError, UNKNOWN};

/// Window radius used when a stage does not set one, in cells.
pub const DEFAULT_WINDOW_CELLS: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlopeParams {
    pub input: String,
    pub output: Option<String>,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            input: LAYER_ELEVATION.to_string(),
            output: None,
        }
    }
}

/// Parameters shared by the window statistics (`step`, `roughness`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowParams {
    pub input: String,
    pub output: Option<String>,
    /// Meters. Defaults to [`DEFAULT_WINDOW_CELLS`] cells.
    pub window_radius: Option<f64>,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            input: LAYER_ELEVATION.to_string(),
            output: None,
            window_radius: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightedTerm {
    pub layer: String,
    /// Layer value at which this term reaches zero.
    pub critical: f64,
    #[serde(default = "unit_weight")]
    pub weight: f64,
}

impl WeightedTerm {
    pub fn new(layer: &str, critical: f64) -> Self {
        Self {
            layer: layer.to_string(),
            critical,
            weight: unit_weight(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

fn unit_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeightedSumParams {
    pub output: Option<String>,
    pub terms: Vec<WeightedTerm>,
}

fn output_or(name: &str, output: &Option<String>) -> String {
    output.clone().unwrap_or_else(|| name.to_string())
}

fn check_radius(config: &StageConfig, radius: Option<f64>) -> Result<(), TraversabilityError> {
    match radius {
        Some(r) if !(r.is_finite() && r > 0.0) => Err(TraversabilityError::Config(format!(
            "stage '{}': window_radius must be positive, got {r}",
            config.name
        ))),
        _ => Ok(()),
    }
}

/// Known values of `grid` inside the disk of `radius` meters around `cell`.
fn window_values(grid: &Grid2d<f64>, cell: UVec2, radius: f64) -> impl Iterator<Item = f64> + '_ {
    let center = grid.info().cell_center(cell);
    AnnulusIterator::new(grid.info(), center, radius, 0.0).filter_map(|c| grid.known(c))
}

/// Slope angle in radians.
#[derive(Debug)]
pub struct SlopeStage {
    name: String,
    input: String,
    output: String,
}

impl SlopeStage {
    pub fn from_config(config: &StageConfig) -> Result<Self, TraversabilityError> {
        let params: SlopeParams = config.parse_params()?;
        Ok(Self {
            output: output_or(&config.name, &params.output),
            name: config.name.clone(),
            input: params.input,
        })
    }
}

impl Stage for SlopeStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&self, map: &mut RasterMap) -> Result<(), TraversabilityError> {
        let input = map.layer(&self.input)?;
        let slope = Grid2d::par_from_fn(input.info().clone(), |cell| {
            input.slope_angle(cell).unwrap_or(UNKNOWN)
        });
        map.insert_layer(&self.output, slope)
    }
}

/// Largest height difference inside the window.
#[derive(Debug)]
pub struct StepStage {
    name: String,
    params: WindowParams,
    output: String,
}

impl StepStage {
    pub fn from_config(config: &StageConfig) -> Result<Self, TraversabilityError> {
        let params: WindowParams = config.parse_params()?;
        check_radius(config, params.window_radius)?;
        Ok(Self {
            output: output_or(&config.name, &params.output),
            name: config.name.clone(),
            params,
        })
    }
}

impl Stage for StepStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&self, map: &mut RasterMap) -> Result<(), TraversabilityError> {
        let radius = self
            .params
            .window_radius
            .unwrap_or(DEFAULT_WINDOW_CELLS * map.resolution());
        let input = map.layer(&self.params.input)?;
        let step = Grid2d::par_from_fn(input.info().clone(), |cell| {
            if input.known(cell).is_none() {
                return UNKNOWN;
            }
            let (lo, hi) = window_values(input, cell, radius)
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            hi - lo
        });
        map.insert_layer(&self.output, step)
    }
}

/// Standard deviation of the height inside the window.
#[derive(Debug)]
pub struct RoughnessStage {
    name: String,
    params: WindowParams,
    output: String,
}

impl RoughnessStage {
    pub fn from_config(config: &StageConfig) -> Result<Self, TraversabilityError> {
        let params: WindowParams = config.parse_params()?;
        check_radius(config, params.window_radius)?;
        Ok(Self {
            output: output_or(&config.name, &params.output),
            name: config.name.clone(),
            params,
        })
    }
}

impl Stage for RoughnessStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&self, map: &mut RasterMap) -> Result<(), TraversabilityError> {
        let radius = self
            .params
            .window_radius
            .unwrap_or(DEFAULT_WINDOW_CELLS * map.resolution());
        let input = map.layer(&self.params.input)?;
        let roughness = Grid2d::par_from_fn(input.info().clone(), |cell| {
            if input.known(cell).is_none() {
                return UNKNOWN;
            }
            let (n, sum, sum_sq) = window_values(input, cell, radius)
                .fold((0usize, 0.0, 0.0), |(n, s, s2), v| (n + 1, s + v, s2 + v * v));
            let mean = sum / n as f64;
            (sum_sq / n as f64 - mean * mean).max(0.0).sqrt()
        });
        map.insert_layer(&self.output, roughness)
    }
}

/// `Σ w·clamp(1 − v/critical, 0, 1) / Σ w` over the known terms of each cell.
#[derive(Debug)]
pub struct WeightedSumStage {
    name: String,
    terms: Vec<WeightedTerm>,
    output: String,
}

impl WeightedSumStage {
    pub fn from_config(config: &StageConfig) -> Result<Self, TraversabilityError> {
        let params: WeightedSumParams = config.parse_params()?;
        let fail = |msg: String| Err(TraversabilityError::Config(format!("stage '{}': {msg}", config.name)));

        if params.terms.is_empty() {
            return fail("weighted_sum needs at least one term".to_string());
        }
        for term in &params.terms {
            if !(term.critical.is_finite() && term.critical > 0.0) {
                return fail(format!("critical value of '{}' must be positive", term.layer));
            }
            if !(term.weight.is_finite() && term.weight >= 0.0) {
                return fail(format!("weight of '{}' must be non-negative", term.layer));
            }
        }
        if params.terms.iter().map(|t| t.weight).sum::<f64>() <= 0.0 {
            return fail("weights sum to zero".to_string());
        }

        Ok(Self {
            output: output_or(&config.name, &params.output),
            name: config.name.clone(),
            terms: params.terms,
        })
    }
}

impl Stage for WeightedSumStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&self, map: &mut RasterMap) -> Result<(), TraversabilityError> {
        let layers = self
            .terms
            .iter()
            .map(|term| map.layer(&term.layer).map(|grid| (term, grid)))
            .collect::<Result<Vec<_>, _>>()?;

        let result = Grid2d::par_from_fn(map.info().clone(), |cell| {
            let (score, weight) = layers
                .iter()
                .filter_map(|(term, grid)| grid.known(cell).map(|v| (term, v)))
                .fold((0.0, 0.0), |(score, weight), (term, v)| {
                    let s = (1.0 - v / term.critical).clamp(0.0, 1.0);
                    (score + term.weight * s, weight + term.weight)
                });
            if weight > 0.0 { score / weight } else { UNKNOWN }
        });
        map.insert_layer(&self.output, result)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::types::MapInfo;

    fn ramp(size: u32, resolution: f64, rise: f64) -> RasterMap {
        let info = MapInfo::square(size, resolution);
        let mut map = RasterMap::new(info.clone());
        let grid = Grid2d::par_from_fn(info, |c| rise * c.x as f64 * resolution);
        map.insert_layer(LAYER_ELEVATION, grid).unwrap();
        map
    }

    #[test]
    fn slope_of_ramp() {
        let mut map = ramp(5, 0.1, 0.5);
        SlopeStage::from_config(&StageConfig::new("slope", "slope"))
            .unwrap()
            .update(&mut map)
            .unwrap();
        let slope = map.at("slope", UVec2::new(2, 2)).unwrap();
        assert_relative_eq!(slope, 0.5f64.atan(), epsilon = 1e-9);
    }

    #[test]
    fn step_sees_raised_neighbor() {
        let mut map = ramp(5, 0.1, 0.0);
        map.layer_mut(LAYER_ELEVATION)
            .unwrap()
            .set(UVec2::new(2, 2), 0.3)
            .unwrap();
        StepStage::from_config(&StageConfig::new("step", "step"))
            .unwrap()
            .update(&mut map)
            .unwrap();
        assert_relative_eq!(map.at("step", UVec2::new(1, 1)).unwrap(), 0.3);
        assert_relative_eq!(map.at("step", UVec2::new(2, 2)).unwrap(), 0.3);
        assert_relative_eq!(map.at("step", UVec2::new(0, 0)).unwrap(), 0.0);
    }

    #[test]
    fn roughness_of_flat_is_zero_and_unknown_stays_unknown() {
        let mut map = ramp(4, 0.1, 0.0);
        map.layer_mut(LAYER_ELEVATION)
            .unwrap()
            .set(UVec2::new(3, 3), UNKNOWN)
            .unwrap();
        RoughnessStage::from_config(&StageConfig::new("roughness", "roughness"))
            .unwrap()
            .update(&mut map)
            .unwrap();
        assert_eq!(map.at("roughness", UVec2::new(1, 1)).unwrap(), 0.0);
        assert!(map.at("roughness", UVec2::new(3, 3)).unwrap().is_nan());
    }

    #[test]
    fn weighted_sum_mixes_terms() {
        let mut map = RasterMap::new(MapInfo::square(1, 1.0));
        map.add_layer("a", 0.5);
        map.add_layer("b", 2.0);
        let config = StageConfig::new("score", "weighted_sum").with_params(&WeightedSumParams {
            output: None,
            terms: vec![
                WeightedTerm::new("a", 1.0).with_weight(3.0),
                WeightedTerm::new("b", 1.0),
            ],
        })
        .unwrap();
        WeightedSumStage::from_config(&config)
            .unwrap()
            .update(&mut map)
            .unwrap();
        // (3 * 0.5 + 1 * 0) / 4
        assert_relative_eq!(map.at("score", UVec2::ZERO).unwrap(), 0.375);
    }

    #[test]
    fn weighted_sum_rejects_bad_terms() {
        let config = StageConfig::new("score", "weighted_sum");
        assert!(WeightedSumStage::from_config(&config).is_err());

        let config = config.with_params(&WeightedSumParams {
            output: None,
            terms: vec![WeightedTerm::new("a", 0.0)],
        })
        .unwrap();
        assert!(matches!(
            WeightedSumStage::from_config(&config),
            Err(TraversabilityError::Config(_))
        ));
    }

    #[test]
    fn output_param_renames_layer() {
        let yaml = "name: s\ntype: slope\nparams:\n  output: incline\n";
        let config: StageConfig = serde_yaml::from_str(yaml).unwrap();
        let mut map = ramp(3, 0.1, 0.0);
        SlopeStage::from_config(&config).unwrap().update(&mut map).unwrap();
        assert!(map.exists("incline"));
        assert!(!map.exists("s"));
    }
}
