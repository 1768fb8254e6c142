//! Feature schema definitions
//!
//! Declares which columns feed the preprocessing pipeline and in which role.
//! Columns outside the schema (free text, identifiers, the odd extra column in
//! an upload) are dropped from the output.

use crate::error::FeatureError;
use carscope_core::columns;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Feature schema version 1
///
/// Ordered numeric and categorical column lists. The order fixes the layout
/// of every [`FeatureVector`](carscope_core::FeatureVector) produced from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSchema {
    /// Schema version for future compatibility
    #[serde(default = "default_version")]
    pub version: u32,

    /// Columns imputed with the median then standardized
    pub numeric: Vec<String>,

    /// Columns imputed with the most frequent value then one-hot encoded
    pub categorical: Vec<String>,
}

fn default_version() -> u32 {
    1
}

/// How the pipeline treats a column
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Numeric,
    Categorical,
    Dropped,
}

impl FeatureSchema {
    pub fn new<S: Into<String>>(
        numeric: impl IntoIterator<Item = S>,
        categorical: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            version: 1,
            numeric: numeric.into_iter().map(Into::into).collect(),
            categorical: categorical.into_iter().map(Into::into).collect(),
        }
    }

    /// The vehicle layout: year, price, cylinders and mileage are numeric;
    /// doors is treated as a category alongside the descriptive columns.
    pub fn vehicle_default() -> Self {
        Self::new(
            [columns::YEAR, columns::PRICE, columns::CYLINDERS, columns::MILEAGE],
            [
                columns::MAKE,
                columns::MODEL,
                columns::FUEL,
                columns::TRANSMISSION,
                columns::TRIM,
                columns::BODY,
                columns::DOORS,
                columns::EXTERIOR_COLOR,
                columns::INTERIOR_COLOR,
                columns::DRIVETRAIN,
                columns::ENGINE,
            ],
        )
    }

    /// [`vehicle_default`](Self::vehicle_default) without the `price` target,
    /// for pipelines that run at inference time
    pub fn vehicle_inference() -> Self {
        let mut schema = Self::vehicle_default();
        schema.numeric.retain(|c| c != columns::PRICE);
        schema
    }

    /// Validate the schema
    /// - At least one column
    /// - No column listed twice or in both roles
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.numeric.is_empty() && self.categorical.is_empty() {
            return Err(FeatureError::EmptySchema);
        }
        let mut seen = HashSet::new();
        for name in self.numeric.iter().chain(&self.categorical) {
            if !seen.insert(name.as_str()) {
                return Err(FeatureError::DuplicateColumn(name.clone()));
            }
        }
        Ok(())
    }

    pub fn role(&self, column: &str) -> ColumnRole {
        if self.numeric.iter().any(|c| c == column) {
            ColumnRole::Numeric
        } else if self.categorical.iter().any(|c| c == column) {
            ColumnRole::Categorical
        } else {
            ColumnRole::Dropped
        }
    }

    /// Every column the pipeline reads, numeric first
    pub fn input_columns(&self) -> Vec<&String> {
        self.numeric.iter().chain(&self.categorical).collect()
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::vehicle_default()
    }
}
