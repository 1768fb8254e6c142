//! On-disk model artifact
//!
//! A JSON document holding the fitted preprocessor next to the tree it feeds:
//!
//! ```json
//! { "preprocessor": { "schema": {...}, "numeric": [...], "categorical": [...] },
//!   "tree": { "n_features": 42, "root": {...} } }
//! ```

use crate::error::{ModelError, Result};
use crate::traits::PriceModel;
use crate::tree::RegressionTree;
use carscope_core::{SourceFile, Table};
use carscope_features::FittedPreprocessor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fitted preprocessing followed by a regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeModel {
    preprocessor: FittedPreprocessor,
    tree: RegressionTree,
}

impl TreeModel {
    pub fn new(preprocessor: FittedPreprocessor, tree: RegressionTree) -> Result<Self> {
        let model = Self { preprocessor, tree };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let model: TreeModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let model = Self::from_json(&json)?;
        info!(
            "Loaded model from {:?}: {} input columns, {} features, depth {}",
            path,
            model.preprocessor.schema().input_columns().len(),
            model.tree.n_features,
            model.tree.depth()
        );
        Ok(model)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }

    pub fn tree(&self) -> &RegressionTree {
        &self.tree
    }

    fn validate(&self) -> Result<()> {
        self.preprocessor.validate()?;
        let width = self.preprocessor.output_dim();
        if self.tree.n_features != width {
            return Err(ModelError::DimensionMismatch {
                expected: width,
                actual: self.tree.n_features,
            });
        }
        self.tree.validate()
    }

    fn missing_columns(&self, table: &Table) -> Vec<String> {
        self.preprocessor
            .schema()
            .input_columns()
            .into_iter()
            .filter(|c| !table.has_column(c))
            .cloned()
            .collect()
    }
}

impl PriceModel for TreeModel {
    fn predict(&self, table: &Table) -> Result<Vec<f64>> {
        let missing = self.missing_columns(table);
        if !missing.is_empty() {
            return Err(ModelError::MissingColumns(missing));
        }
        let predictions = self
            .preprocessor
            .transform_table(table)
            .iter()
            .map(|x| self.tree.predict_one(x.as_slice()))
            .collect::<Result<Vec<f64>>>()?;
        debug!("Predicted {} rows", predictions.len());
        Ok(predictions)
    }

    fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        Some(aggregate_importances(
            &self.preprocessor.source_columns(),
            &self.tree.feature_importances(),
        ))
    }

    fn n_features_in(&self) -> Option<usize> {
        Some(self.tree.n_features)
    }

    fn input_columns(&self) -> Vec<String> {
        self.preprocessor
            .schema()
            .input_columns()
            .into_iter()
            .cloned()
            .collect()
    }
}

/// Sum per-slot importances into their source columns, highest first.
/// Equal importances keep first-seen column order.
pub fn aggregate_importances(sources: &[&str], importances: &[f64]) -> Vec<(String, f64)> {
    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for (&source, value) in sources.iter().zip(importances) {
        let entry = totals.entry(source).or_insert_with(|| {
            order.push(source);
            0.0
        });
        *entry += value;
    }
    let mut aggregated: Vec<(String, f64)> = order
        .into_iter()
        .map(|c| (c.to_string(), totals[c]))
        .collect();
    aggregated.sort_by(|a, b| b.1.total_cmp(&a.1));
    aggregated
}

/// Model file metadata for the model info endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub path: PathBuf,
    pub loaded: bool,
    pub size_kib: Option<f64>,
    pub last_modified: Option<String>,
    pub n_features_in: Option<usize>,
    pub features_used: Vec<String>,
}

impl ModelInfo {
    pub fn describe(path: &Path, model: Option<&dyn PriceModel>) -> Self {
        let file = SourceFile::stat(path).ok();
        Self {
            path: path.to_path_buf(),
            loaded: model.is_some(),
            size_kib: file.as_ref().map(SourceFile::size_kib),
            last_modified: file.as_ref().and_then(SourceFile::modified_label),
            n_features_in: model.and_then(|m| m.n_features_in()),
            features_used: model.map(|m| m.input_columns()).unwrap_or_default(),
        }
    }
}
