use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraversabilityError {
    #[error("uninitialized input: {0}")]
    UninitializedInput(String),
    #[error("missing layer '{0}'")]
    MissingLayer(String),
    #[error("geometry mismatch: {0}")]
    GeometryMismatch(String),
    #[error("pipeline stage '{stage}' failed: {reason}")]
    Pipeline { stage: String, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("degenerate geometry: {0}")]
    Geometry(String),
    #[error("out of bounds: {0}")]
    OutOfBounds(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl TraversabilityError {
    pub(crate) fn pipeline(stage: &str, reason: impl Into<String>) -> Self {
        Self::Pipeline {
            stage: stage.to_string(),
            reason: reason.into(),
        }
    }
}
