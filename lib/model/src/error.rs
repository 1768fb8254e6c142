use carscope_features::FeatureError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid model artifact JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid model artifact: {0}")]
    Invalid(String),

    #[error("Input is missing columns required by the model: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Invalid feature dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    #[error("Data error: {0}")]
    Data(#[from] carscope_core::Error),
}
