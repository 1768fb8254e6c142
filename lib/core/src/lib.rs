//! # carscope Core
//!
//! Core library for carscope, the vehicle price exploration service.
//!
//! This crate provides the data model and the read-only analytics over it:
//!
//! - [`FieldValue`] - A single table cell (number, text or missing)
//! - [`VehicleRecord`] - One vehicle row keyed by column name
//! - [`Table`] - Ordered columns and rows with CSV input and output
//! - [`Dataset`] - The reference table, restricted to rows with a price
//! - [`FeatureVector`] - Fixed-width numeric vector with Euclidean distance
//!
//! ## Example
//!
//! ```rust
//! use carscope_core::{Dataset, Table, analytics};
//!
//! let csv = "make,model,year,price\nToyota,Camry,2020,20000\nFord,F-150,2019,\n";
//! let dataset = Dataset::from_table(Table::from_csv_bytes(csv.as_bytes()).unwrap()).unwrap();
//! assert_eq!(dataset.len(), 1);
//!
//! let stats = analytics::price_stats(&dataset).unwrap();
//! assert_eq!(stats.mean, 20000.0);
//! ```

pub mod analytics;
pub mod dataset;
pub mod engineered;
pub mod error;
pub mod record;
pub mod table;
pub mod value;
pub mod vector;

pub use analytics::{
    BrowseRequest, DatasetInfo, DescribeStats, FormOptions, GroupMean, Histogram, HistogramBin,
    VehicleFilter, VehicleMatch,
};
pub use dataset::{Dataset, SourceFile};
pub use engineered::EngineeredInsights;
pub use error::{Error, Result};
pub use record::{columns, VehicleRecord};
pub use table::Table;
pub use value::{format_number, format_thousands, FieldValue};
pub use vector::FeatureVector;
