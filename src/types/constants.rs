/// Sentinel for cells without a value. Resolved to the configured default on read.
pub const UNKNOWN: f64 = f64::NAN;

pub const TRAVERSABLE: f64 = 1.0;
pub const NOT_TRAVERSABLE: f64 = 0.0;

pub const LAYER_ELEVATION: &str = "elevation";
pub const LAYER_TRAVERSABILITY: &str = "traversability";
pub const LAYER_STEP: &str = "step";
pub const LAYER_SLOPE: &str = "slope";
pub const LAYER_ROUGHNESS: &str = "roughness";
pub const LAYER_FOOTPRINT_FIXED: &str = "footprint_fixed";
pub const LAYER_FOOTPRINT_ORIENTED: &str = "footprint_oriented";

/// Layers an elevation snapshot must carry.
pub const ELEVATION_LAYERS: &[&str] = &[LAYER_ELEVATION];

/// Layers a traversability snapshot must carry. The footprint layers are optional.
pub const TRAVERSABILITY_LAYERS: &[&str] =
    &[LAYER_TRAVERSABILITY, LAYER_STEP, LAYER_SLOPE, LAYER_ROUGHNESS];

pub const FOOTPRINT_LAYERS: &[&str] = &[LAYER_FOOTPRINT_FIXED, LAYER_FOOTPRINT_ORIENTED];
