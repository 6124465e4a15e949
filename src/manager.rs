//! Thread-safe owner of the elevation and traversability rasters.
//!
//! Both rasters are published as `Arc` snapshots. Updates serialize on one
//! mutex, build the new raster from a snapshot without holding any raster
//! lock, and take the write lock only to swap the pointer. Queries clone the
//! current snapshot and evaluate without locks, so a long query never blocks
//! an update and always sees one consistent raster.

use std::sync::Arc;
use std::time::Instant;

use glam::DVec2;
use parking_lot::{Mutex, RwLock};

use crate::classify::NeighborhoodClassifier;
use crate::config::TraversabilityConfig;
use crate::evaluate::Evaluator;
use crate::grid::RasterMap;
use crate::pipeline::{Pipeline, StageConfig, StageRegistry};
use crate::raster::TraversabilityRaster;
use crate::types::{
    ELEVATION_LAYERS, FootprintPath, LAYER_ELEVATION, LAYER_TRAVERSABILITY, MapInfo,
    NOT_TRAVERSABLE, Polygon, PolygonResult, TRAVERSABILITY_LAYERS, TraversabilityError,
    TraversabilityResult,
};

pub struct TraversabilityMap {
    config: TraversabilityConfig,
    registry: StageRegistry,
    pipeline: RwLock<Arc<Pipeline>>,
    elevation: RwLock<Option<Arc<RasterMap>>>,
    traversability: RwLock<Option<Arc<TraversabilityRaster>>>,
    update: Mutex<()>,
}

impl TraversabilityMap {
    pub fn new(config: TraversabilityConfig) -> Result<Self, TraversabilityError> {
        Self::with_registry(config, StageRegistry::default())
    }

    /// Use `registry` to build the configured filter chain and any later one.
    pub fn with_registry(
        config: TraversabilityConfig,
        registry: StageRegistry,
    ) -> Result<Self, TraversabilityError> {
        config.validate()?;
        let pipeline = registry.build_pipeline(&config.filter_chain()?)?;
        Ok(Self {
            config,
            registry,
            pipeline: RwLock::new(Arc::new(pipeline)),
            elevation: RwLock::new(None),
            traversability: RwLock::new(None),
            update: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &TraversabilityConfig {
        &self.config
    }

    pub fn elevation_map(&self) -> Option<Arc<RasterMap>> {
        self.elevation.read().clone()
    }

    pub fn traversability_map(&self) -> Option<Arc<TraversabilityRaster>> {
        self.traversability.read().clone()
    }

    pub fn traversability_map_initialized(&self) -> bool {
        self.traversability.read().is_some()
    }

    pub fn filter_stage_names(&self) -> Vec<String> {
        self.pipeline
            .read()
            .stage_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn snapshot(&self) -> Result<Arc<TraversabilityRaster>, TraversabilityError> {
        self.traversability_map().ok_or_else(|| {
            TraversabilityError::UninitializedInput("traversability map not set".to_string())
        })
    }

    fn check_frame(&self, info: &MapInfo) -> Result<(), TraversabilityError> {
        if info.frame_id == self.config.map_frame_id {
            Ok(())
        } else {
            Err(TraversabilityError::GeometryMismatch(format!(
                "raster is in frame '{}', expected '{}'",
                info.frame_id, self.config.map_frame_id
            )))
        }
    }

    /// Replace the elevation raster.
    pub fn set_elevation_map(&self, map: RasterMap) -> Result<(), TraversabilityError> {
        let _guard = self.update.lock();
        self.validate_elevation(&map).inspect_err(|e| {
            log::warn!("rejected elevation map: {e}");
        })?;
        *self.elevation.write() = Some(Arc::new(map));
        log::debug!("elevation map updated");
        Ok(())
    }

    fn validate_elevation(&self, map: &RasterMap) -> Result<(), TraversabilityError> {
        map.validate_layers(ELEVATION_LAYERS)?;
        self.check_frame(map.info())?;
        if let Some(traversability) = self.traversability_map() {
            traversability.map.check_geometry(map.info())?;
        }
        Ok(())
    }

    /// Replace the traversability raster with externally computed layers.
    ///
    /// Missing footprint layers are added as unknown.
    pub fn set_traversability_map(&self, map: RasterMap) -> Result<(), TraversabilityError> {
        let _guard = self.update.lock();
        let raster = self.validate_traversability(map).inspect_err(|e| {
            log::warn!("rejected traversability map: {e}");
        })?;
        log::debug!(
            "traversability map set: {} traversable, {} not traversable",
            raster.n_traversable,
            raster.n_not_traversable
        );
        *self.traversability.write() = Some(Arc::new(raster));
        Ok(())
    }

    fn validate_traversability(
        &self,
        map: RasterMap,
    ) -> Result<TraversabilityRaster, TraversabilityError> {
        map.validate_layers(TRAVERSABILITY_LAYERS)?;
        self.check_frame(map.info())?;
        if let Some(elevation) = self.elevation_map() {
            elevation.check_geometry(map.info())?;
        }
        TraversabilityRaster::new(map, self.config.traversability_threshold)
    }

    /// Derive a new traversability raster from the current elevation raster.
    pub fn compute_traversability(&self) -> Result<(), TraversabilityError> {
        let _guard = self.update.lock();
        let start = Instant::now();
        let raster = self.derive().inspect_err(|e| {
            log::warn!("traversability computation failed: {e}");
        })?;
        log::info!(
            "traversability computed in {:?}: {} traversable, {} not traversable",
            start.elapsed(),
            raster.n_traversable,
            raster.n_not_traversable
        );
        *self.traversability.write() = Some(Arc::new(raster));
        Ok(())
    }

    fn derive(&self) -> Result<TraversabilityRaster, TraversabilityError> {
        let elevation = self.elevation_map().ok_or_else(|| {
            TraversabilityError::UninitializedInput("elevation map not set".to_string())
        })?;
        let pipeline = self.pipeline.read().clone();

        let mut output = pipeline.update(&elevation)?;
        output
            .validate_layers(TRAVERSABILITY_LAYERS)
            .map_err(|e| TraversabilityError::pipeline("output", e.to_string()))?;

        let classifier = NeighborhoodClassifier::new(&self.config, output.resolution());
        let hazards = classifier.hazards(elevation.layer(LAYER_ELEVATION)?);
        let traversability = output.layer_mut(LAYER_TRAVERSABILITY)?;
        let mut n_hazards = 0;
        for (value, _) in traversability
            .data_mut()
            .iter_mut()
            .zip(hazards)
            .filter(|(_, hazard)| *hazard)
        {
            *value = NOT_TRAVERSABLE;
            n_hazards += 1;
        }
        log::debug!("{n_hazards} cells fail the step or slope check");

        let mut raster = TraversabilityRaster::new(output, self.config.traversability_threshold)?;
        raster.traversability_footprint(&self.config, self.config.footprint_yaw)?;
        raster.traversability_footprint_radius(
            &self.config,
            self.config.footprint_precompute_radius,
            0.0,
        )?;
        Ok(raster)
    }

    /// Rebuild the filter chain. On failure the current chain stays in place.
    pub fn update_filter(&self, stages: &[StageConfig]) -> Result<(), TraversabilityError> {
        let pipeline = self.registry.build_pipeline(stages).inspect_err(|e| {
            log::warn!("rejected filter chain: {e}");
        })?;
        log::info!("filter chain updated: {:?}", pipeline.stage_names());
        *self.pipeline.write() = Arc::new(pipeline);
        Ok(())
    }

    /// Rebuild the filter chain from a YAML list of `{ name, type, params }`.
    pub fn update_filter_from_yaml(&self, yaml: &str) -> Result<(), TraversabilityError> {
        let stages: Vec<StageConfig> = serde_yaml::from_str(yaml).map_err(|e| {
            log::warn!("rejected filter chain: {e}");
            TraversabilityError::Config(e.to_string())
        })?;
        self.update_filter(&stages)
    }

    /// Apply `f` to a copy of the current traversability raster and publish the result.
    fn modify<F>(&self, f: F) -> Result<(), TraversabilityError>
    where
        F: FnOnce(&mut TraversabilityRaster) -> Result<(), TraversabilityError>,
    {
        let _guard = self.update.lock();
        let snapshot = self.snapshot()?;
        let mut raster = TraversabilityRaster::clone(&snapshot);
        f(&mut raster)?;
        *self.traversability.write() = Some(Arc::new(raster));
        Ok(())
    }

    pub fn reset_traversability_footprint_layers(&self) -> Result<(), TraversabilityError> {
        self.modify(|raster| {
            raster.reset_footprint_layers();
            Ok(())
        })
    }

    /// Refill `footprint_fixed` for heading `yaw`.
    pub fn traversability_footprint(&self, yaw: f64) -> Result<(), TraversabilityError> {
        self.modify(|raster| raster.traversability_footprint(&self.config, yaw))
    }

    /// Refill `footprint_oriented` with the annulus `[offset, radius]`.
    pub fn traversability_footprint_radius(
        &self,
        radius: f64,
        offset: f64,
    ) -> Result<(), TraversabilityError> {
        self.modify(|raster| raster.traversability_footprint_radius(&self.config, radius, offset))
    }

    pub fn traversable_fraction(&self) -> Result<f64, TraversabilityError> {
        Ok(self.snapshot()?.traversable_fraction())
    }

    pub fn print_traversable_fraction(&self) -> Result<(), TraversabilityError> {
        let raster = self.snapshot()?;
        log::info!(
            "traversable fraction: {:.3} ({} of {} known cells)",
            raster.traversable_fraction(),
            raster.n_traversable,
            raster.n_traversable + raster.n_not_traversable
        );
        Ok(())
    }

    /// Evaluator over `raster`, reading heights from `elevation` when the
    /// raster itself carries no elevation layer.
    fn evaluator<'a>(
        &'a self,
        raster: &'a TraversabilityRaster,
        elevation: Option<&'a RasterMap>,
    ) -> Result<Evaluator<'a>, TraversabilityError> {
        let evaluator = Evaluator::new(raster, &self.config)?;
        match elevation {
            Some(map) if !raster.map.exists(LAYER_ELEVATION) => {
                Ok(evaluator.with_elevation(map.layer(LAYER_ELEVATION)?))
            }
            _ => Ok(evaluator),
        }
    }

    pub fn check_polygon(&self, polygon: &Polygon) -> Result<PolygonResult, TraversabilityError> {
        let raster = self.snapshot()?;
        Evaluator::new(&raster, &self.config)?.is_traversable_polygon(polygon)
    }

    pub fn check_circle(
        &self,
        center: DVec2,
        radius_max: f64,
        radius_min: f64,
    ) -> Result<PolygonResult, TraversabilityError> {
        let raster = self.snapshot()?;
        Evaluator::new(&raster, &self.config)?.is_traversable_circle(center, radius_max, radius_min)
    }

    pub fn check_inclination(&self, start: DVec2, end: DVec2) -> Result<bool, TraversabilityError> {
        let raster = self.snapshot()?;
        let elevation = self.elevation_map();
        self.evaluator(&raster, elevation.as_deref())?
            .check_inclination(start, end)
    }

    pub fn check_footprint_path(
        &self,
        path: &FootprintPath,
    ) -> Result<TraversabilityResult, TraversabilityError> {
        let raster = self.snapshot()?;
        let elevation = self.elevation_map();
        self.evaluator(&raster, elevation.as_deref())?
            .check_footprint_path(path)
    }
}
