use crate::error::Result;
use carscope_core::Table;

/// A pre-trained price regressor.
///
/// Implementations receive raw vehicle rows and own whatever preprocessing
/// they need. Callers never see feature vectors.
pub trait PriceModel: Send + Sync {
    /// One predicted price per row, in row order. An empty table yields an
    /// empty vector.
    fn predict(&self, table: &Table) -> Result<Vec<f64>>;

    /// Relative importance per source column, highest first
    fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        None
    }

    /// Number of model input features after preprocessing
    fn n_features_in(&self) -> Option<usize> {
        None
    }

    /// Raw input columns the model reads
    fn input_columns(&self) -> Vec<String> {
        Vec::new()
    }
}
