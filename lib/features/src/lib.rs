//! # carscope Features
//!
//! Turns raw vehicle records into model-ready numeric vectors, and finds the
//! dataset vehicle closest to a partially filled query.
//!
//! ## Features
//!
//! - **Feature Schema**: Declares which columns are numeric and which are categorical
//! - **Fitted Preprocessor**: Median/most-frequent imputation, standardization and one-hot encoding,
//!   fitted once and applied identically afterwards
//! - **Similarity Finder**: Euclidean nearest neighbour over year, mileage, cylinders and doors,
//!   with a per-feature breakdown of the distance
//!
//! ## Example
//!
//! ```rust
//! use carscope_core::{Table, VehicleRecord};
//! use carscope_features::{FeatureSchema, Preprocessor};
//!
//! let csv = "year,mileage,make\n2018,40000,Ford\n2022,10000,Toyota\n";
//! let training = Table::from_csv_bytes(csv.as_bytes()).unwrap();
//!
//! let schema = FeatureSchema::new(["year", "mileage"], ["make"]);
//! let fitted = Preprocessor::new(schema).fit(&training).unwrap();
//! assert_eq!(fitted.output_dim(), 4);
//!
//! let query = VehicleRecord::new().with("year", 2020.0).with("make", "Ford");
//! let vector = fitted.transform(&query);
//! assert_eq!(vector.as_slice()[0], 0.0);
//! assert_eq!(&vector.as_slice()[2..], &[1.0, 0.0]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────────┐
//! │   Schema    │────>│ Preprocessor │────>│ FittedPreprocessor│──> FeatureVector
//! │ (columns)   │     │   fit(&T)    │     │   transform(&r)   │
//! └─────────────┘     └──────────────┘     └───────────────────┘
//!
//! ┌─────────────┐     ┌──────────────────┐
//! │   Dataset   │────>│ SimilarityFinder │──> NearestMatch + comparison
//! └─────────────┘     └──────────────────┘
//! ```

pub mod encoder;
pub mod error;
pub mod imputer;
pub mod nearest;
pub mod pipeline;
pub mod scaler;
pub mod schema;

pub use encoder::OneHotEncoder;
pub use error::{FeatureError, Result};
pub use imputer::{ImputeStrategy, ImputeValue};
pub use nearest::{
    find_nearest, FeatureComparison, NearestMatch, SimilarityFinder, SIMILARITY_FEATURES,
};
pub use pipeline::{CategoricalColumn, FittedPreprocessor, NumericColumn, Preprocessor};
pub use scaler::StandardScaler;
pub use schema::{ColumnRole, FeatureSchema};
