//! # carscope
//!
//! A vehicle price exploration service.
//!
//! carscope serves predictions from a pre-trained regression model, finds the
//! closest real vehicle to any requested configuration and answers descriptive questions
//! about the reference dataset.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! carscope serve --dataset dataset/dataset.csv --model model/vehicle_price_model.json --http-port 8080
//! carscope batch uploads/cars.csv predictions.csv
//! carscope similar --year 2021 --mileage 25 --cylinders 4 --doors 4
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use carscope::prelude::*;
//!
//! let dataset = Dataset::load("dataset/dataset.csv").unwrap();
//! let model = TreeModel::load("model/vehicle_price_model.json").unwrap();
//!
//! let query = VehicleRecord::new()
//!     .with("make", "Toyota")
//!     .with("year", 2021.0)
//!     .with("mileage", 25.0);
//!
//! let table = Table::from_records(&model.input_columns(), vec![query.clone()]);
//! let price = model.predict(&table).unwrap()[0];
//! let closest = find_nearest(&dataset, &query).unwrap();
//! println!("${:.2}, closest: row {}", price, closest.index);
//! ```
//!
//! ## Crate Structure
//!
//! - `carscope-core` - Records, tables, dataset loading and analytics
//! - `carscope-features` - Preprocessing pipeline and similar-vehicle search
//! - `carscope-model` - Model interface, tree artifact and batch prediction
//! - `carscope-api` - REST API and sessions

// Re-export core types
pub use carscope_core::{
    analytics, Dataset, Error, FeatureVector, FieldValue, Result, Table, VehicleRecord,
};

// Re-export features
pub use carscope_features::{
    find_nearest, FeatureSchema, FittedPreprocessor, NearestMatch, Preprocessor, SimilarityFinder,
};

// Re-export model
pub use carscope_model::{BatchPrediction, ModelError, ModelInfo, PriceModel, TreeModel};

// Re-export API
pub use carscope_api::{Resources, RestApi, ServerConfig, SessionStore};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        find_nearest, BatchPrediction, Dataset, FeatureSchema, FieldValue, FittedPreprocessor,
        NearestMatch, Preprocessor, PriceModel, Resources, RestApi, ServerConfig, SessionStore,
        SimilarityFinder, Table, TreeModel, VehicleRecord,
    };
}
