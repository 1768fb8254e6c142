use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeatureError>;

/// Errors raised while fitting the pipeline or querying neighbours.
/// Transforming a record never fails.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeatureError {
    #[error("Schema cannot be empty")]
    EmptySchema,

    #[error("Column '{0}' appears more than once in the schema")]
    DuplicateColumn(String),

    #[error("Training table has no rows")]
    EmptyTrainingSet,

    #[error("Column '{0}' not found in training table")]
    MissingColumn(String),

    #[error("Column '{0}' has no observed values to fit on")]
    NoObservedValues(String),

    #[error("Invalid fitted state for column '{column}': {reason}")]
    InvalidFittedState { column: String, reason: String },

    #[error("Cannot search for a nearest vehicle in an empty dataset")]
    EmptyDataset,
}
