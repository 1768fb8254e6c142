use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Vehicle column names used across the workspace
pub mod columns {
    pub const YEAR: &str = "year";
    pub const PRICE: &str = "price";
    pub const CYLINDERS: &str = "cylinders";
    pub const MILEAGE: &str = "mileage";
    pub const DOORS: &str = "doors";
    pub const MAKE: &str = "make";
    pub const MODEL: &str = "model";
    pub const FUEL: &str = "fuel";
    pub const TRANSMISSION: &str = "transmission";
    pub const TRIM: &str = "trim";
    pub const BODY: &str = "body";
    pub const EXTERIOR_COLOR: &str = "exterior_color";
    pub const INTERIOR_COLOR: &str = "interior_color";
    pub const DRIVETRAIN: &str = "drivetrain";
    pub const ENGINE: &str = "engine";
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
}

/// A vehicle row: column name to cell value.
///
/// A column absent from the map reads as [`FieldValue::Missing`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleRecord {
    fields: HashMap<String, FieldValue, ahash::RandomState>,
}

static MISSING: FieldValue = FieldValue::Missing;

impl VehicleRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell value for `column`, `Missing` when absent
    #[inline]
    pub fn get(&self, column: &str) -> &FieldValue {
        self.fields.get(column).unwrap_or(&MISSING)
    }

    #[inline]
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column).as_f64()
    }

    /// Text view of a cell, numbers rendered canonically
    pub fn get_text(&self, column: &str) -> Option<String> {
        self.get(column).category_key()
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(column.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Short human label: `"2020 Toyota Camry"`
    pub fn title(&self) -> String {
        [columns::YEAR, columns::MAKE, columns::MODEL]
            .iter()
            .filter_map(|c| self.get_text(c))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for VehicleRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = VehicleRecord::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}
