//! # carscope Model
//!
//! Loads the pre-trained price model and runs it over vehicle tables.
//!
//! The model is opaque behind [`PriceModel`]: callers hand it raw rows and get
//! prices back. The bundled implementation, [`TreeModel`], is a JSON artifact
//! pairing a fitted preprocessor with a regression tree. Nothing in this crate
//! trains or refits a model.
//!
//! - [`PriceModel`] - Prediction, feature importances and input width
//! - [`TreeModel`] - Decision-tree artifact loader and validator
//! - [`ModelInfo`] - File metadata for display
//! - [`BatchPrediction`] - CSV upload in, predictions, insights and CSV export out

pub mod artifact;
pub mod batch;
pub mod error;
pub mod traits;
pub mod tree;

pub use artifact::{aggregate_importances, ModelInfo, TreeModel};
pub use batch::{BatchInsights, BatchPrediction, ScatterPoint, PREDICTION_COLUMN};
pub use error::{ModelError, Result};
pub use traits::PriceModel;
pub use tree::{RegressionTree, TreeNode};
