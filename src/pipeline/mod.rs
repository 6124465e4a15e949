//! Layer derivation pipeline.
//!
//! A pipeline is an ordered list of [`Stage`]s, each reading some layers of a
//! [`RasterMap`] and writing one. Stages are built from [`StageConfig`] entries
//! through a [`StageRegistry`], which maps a stage `type` to a factory:
//!
//! ```yaml
//! - name: step
//!   type: step
//!   params:
//!     window_radius: 0.15
//! ```

pub mod stages;

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::grid::RasterMap;
use crate::types::TraversabilityError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub stage_type: String,
    #[serde(default)]
    pub params: serde_yaml::Value,
}

impl StageConfig {
    pub fn new(name: &str, stage_type: &str) -> Self {
        Self {
            name: name.to_string(),
            stage_type: stage_type.to_string(),
            params: serde_yaml::Value::Null,
        }
    }

    pub fn with_params<P: Serialize>(mut self, params: &P) -> Result<Self, TraversabilityError> {
        self.params = serde_yaml::to_value(params).map_err(|e| {
            TraversabilityError::Config(format!("stage '{}' params: {e}", self.name))
        })?;
        Ok(self)
    }

    /// Decode `params` into a typed parameter struct. Missing params give the default.
    pub fn parse_params<P>(&self) -> Result<P, TraversabilityError>
    where
        P: DeserializeOwned + Default,
    {
        if self.params.is_null() {
            return Ok(P::default());
        }
        serde_yaml::from_value(self.params.clone()).map_err(|e| {
            TraversabilityError::Config(format!("stage '{}' ({}): {e}", self.name, self.stage_type))
        })
    }
}

/// One derivation step over a raster.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    /// Read input layers of `map` and write the stage output into it.
    fn update(&self, map: &mut RasterMap) -> Result<(), TraversabilityError>;
}

pub type StageFactory =
    Box<dyn Fn(&StageConfig) -> Result<Box<dyn Stage>, TraversabilityError> + Send + Sync>;

pub struct StageRegistry {
    factories: HashMap<String, StageFactory>,
}

impl StageRegistry {
    /// Registry without any stage types.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the `slope`, `step`, `roughness` and `weighted_sum` stages.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("slope", |config| {
            Ok(Box::new(stages::SlopeStage::from_config(config)?) as Box<dyn Stage>)
        });
        registry.register("step", |config| {
            Ok(Box::new(stages::StepStage::from_config(config)?) as Box<dyn Stage>)
        });
        registry.register("roughness", |config| {
            Ok(Box::new(stages::RoughnessStage::from_config(config)?) as Box<dyn Stage>)
        });
        registry.register("weighted_sum", |config| {
            Ok(Box::new(stages::WeightedSumStage::from_config(config)?) as Box<dyn Stage>)
        });
        registry
    }

    /// Add or replace the factory for `stage_type`.
    pub fn register<F>(&mut self, stage_type: &str, factory: F)
    where
        F: Fn(&StageConfig) -> Result<Box<dyn Stage>, TraversabilityError> + Send + Sync + 'static,
    {
        self.factories
            .insert(stage_type.to_string(), Box::new(factory));
    }

    pub fn contains(&self, stage_type: &str) -> bool {
        self.factories.contains_key(stage_type)
    }

    pub fn build(&self, config: &StageConfig) -> Result<Box<dyn Stage>, TraversabilityError> {
        let factory = self.factories.get(&config.stage_type).ok_or_else(|| {
            TraversabilityError::Config(format!(
                "stage '{}' has unknown type '{}'",
                config.name, config.stage_type
            ))
        })?;
        factory(config)
    }

    /// Build every stage; the first failure aborts with `Config`.
    pub fn build_pipeline(&self, configs: &[StageConfig]) -> Result<Pipeline, TraversabilityError> {
        if configs.is_empty() {
            return Err(TraversabilityError::Config("filter chain is empty".to_string()));
        }
        let stages = configs
            .iter()
            .map(|config| self.build(config))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Pipeline { stages })
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order on a copy of `input`.
    pub fn update(&self, input: &RasterMap) -> Result<RasterMap, TraversabilityError> {
        let mut map = input.clone();
        for stage in &self.stages {
            let start = Instant::now();
            stage.update(&mut map).map_err(|e| match e {
                TraversabilityError::Pipeline { .. } => e,
                other => TraversabilityError::pipeline(stage.name(), other.to_string()),
            })?;
            log::debug!("stage '{}' took {:?}", stage.name(), start.elapsed());
        }
        Ok(map)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}
