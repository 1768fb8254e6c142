//! Process-wide resources shared by every request

use crate::config::ServerConfig;
use crate::error::{ApiError, Result};
use carscope_core::analytics::{form_options, FormOptions};
use carscope_core::Dataset;
use carscope_features::SimilarityFinder;
use carscope_model::{ModelInfo, PriceModel, TreeModel};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Dataset, model and derived lookups. Built once at startup and only read
/// afterwards.
pub struct Resources {
    dataset: Arc<Dataset>,
    model: Option<Arc<dyn PriceModel>>,
    model_info: ModelInfo,
    finder: SimilarityFinder,
    form_options: FormOptions,
}

impl Resources {
    pub fn new(dataset: Dataset, model: Option<Arc<dyn PriceModel>>, model_path: &Path) -> Self {
        let dataset = Arc::new(dataset);
        let model_info = ModelInfo::describe(model_path, model.as_deref());
        Self {
            finder: SimilarityFinder::new(dataset.clone()),
            form_options: form_options(&dataset),
            dataset,
            model,
            model_info,
        }
    }

    /// Load the dataset and model named in `config`.
    ///
    /// A dataset that cannot be read is an error. A model that cannot be
    /// loaded is logged and leaves prediction disabled.
    pub fn load(config: &ServerConfig) -> carscope_core::Result<Self> {
        let dataset = Dataset::load(&config.dataset_path)?;
        let model = load_model(&config.model_path);
        Ok(Self::new(dataset, model, &config.model_path))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn finder(&self) -> &SimilarityFinder {
        &self.finder
    }

    pub fn form_options(&self) -> &FormOptions {
        &self.form_options
    }

    pub fn model_info(&self) -> &ModelInfo {
        &self.model_info
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// The loaded model, or [`ApiError::ModelUnavailable`]
    pub fn model(&self) -> Result<&dyn PriceModel> {
        self.model.as_deref().ok_or(ApiError::ModelUnavailable)
    }
}

fn load_model(path: &Path) -> Option<Arc<dyn PriceModel>> {
    if !path.exists() {
        warn!(
            "Model file not found at {:?}; prediction endpoints are disabled",
            path
        );
        return None;
    }
    match TreeModel::load(path) {
        Ok(model) => {
            info!("Model ready");
            Some(Arc::new(model))
        }
        Err(e) => {
            warn!(
                "Failed to load model from {:?}: {}; prediction endpoints are disabled",
                path, e
            );
            None
        }
    }
}
