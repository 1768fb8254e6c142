//! Preprocessing pipeline
//!
//! Turns a raw [`VehicleRecord`] into a fixed-width [`FeatureVector`]:
//!
//! ```text
//! numeric      ──> median impute ──> standardize ──┐
//!                                                  ├──> FeatureVector
//! categorical  ──> mode impute   ──> one-hot     ──┘
//! text / other ──> dropped
//! ```
//!
//! [`Preprocessor::fit`] runs once against a training table and returns a
//! [`FittedPreprocessor`]. The fitted type only transforms; its statistics
//! cannot be refit.

use crate::encoder::OneHotEncoder;
use crate::error::{FeatureError, Result};
use crate::imputer::{ImputeStrategy, ImputeValue};
use crate::scaler::StandardScaler;
use crate::schema::FeatureSchema;
use carscope_core::{FeatureVector, Table, VehicleRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Unfitted pipeline: a schema waiting for training data
#[derive(Debug, Clone)]
pub struct Preprocessor {
    schema: FeatureSchema,
}

impl Preprocessor {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    /// Pipeline over [`FeatureSchema::vehicle_default`]
    pub fn vehicle_default() -> Self {
        Self::new(FeatureSchema::vehicle_default())
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Learn medians, scaling statistics, modes and category sets from
    /// `training`. Consumes the unfitted pipeline.
    pub fn fit(self, training: &Table) -> Result<FittedPreprocessor> {
        self.schema.validate()?;
        if training.is_empty() {
            return Err(FeatureError::EmptyTrainingSet);
        }

        let mut numeric = Vec::with_capacity(self.schema.numeric.len());
        for name in &self.schema.numeric {
            numeric.push(fit_numeric(training, name)?);
        }

        let mut categorical = Vec::with_capacity(self.schema.categorical.len());
        for name in &self.schema.categorical {
            categorical.push(fit_categorical(training, name)?);
        }

        let fitted = FittedPreprocessor {
            schema: self.schema,
            numeric,
            categorical,
        };
        debug!(
            "Fitted preprocessor on {} rows: {} numeric, {} categorical, {} output features",
            training.len(),
            fitted.numeric.len(),
            fitted.categorical.len(),
            fitted.output_dim()
        );
        Ok(fitted)
    }
}

fn require_column(training: &Table, name: &str) -> Result<()> {
    if training.has_column(name) {
        Ok(())
    } else {
        Err(FeatureError::MissingColumn(name.to_string()))
    }
}

fn fit_numeric(training: &Table, name: &str) -> Result<NumericColumn> {
    require_column(training, name)?;
    let column = training.rows().iter().map(|r| r.get(name));
    let median = match ImputeStrategy::Median.fit(column) {
        Some(ImputeValue::Numeric(m)) => m,
        _ => return Err(FeatureError::NoObservedValues(name.to_string())),
    };

    let imputed: Vec<f64> = training
        .rows()
        .iter()
        .map(|r| r.get_f64(name).unwrap_or(median))
        .collect();

    Ok(NumericColumn {
        name: name.to_string(),
        median,
        scaler: StandardScaler::fit(&imputed),
    })
}

fn fit_categorical(training: &Table, name: &str) -> Result<CategoricalColumn> {
    require_column(training, name)?;
    let column = training.rows().iter().map(|r| r.get(name));
    let mode = match ImputeStrategy::MostFrequent.fit(column) {
        Some(ImputeValue::Category(m)) => m,
        _ => return Err(FeatureError::NoObservedValues(name.to_string())),
    };

    let encoder = OneHotEncoder::fit(
        training
            .rows()
            .iter()
            .map(|r| r.get_text(name).unwrap_or_else(|| mode.clone())),
    );

    Ok(CategoricalColumn {
        name: name.to_string(),
        mode,
        encoder,
    })
}

/// Fitted state of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    pub median: f64,
    pub scaler: StandardScaler,
}

impl NumericColumn {
    #[inline]
    fn transform(&self, record: &VehicleRecord) -> f64 {
        let raw = record.get_f64(&self.name).unwrap_or(self.median);
        self.scaler.transform(raw)
    }
}

/// Fitted state of one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub mode: String,
    pub encoder: OneHotEncoder,
}

/// A pipeline with learned statistics. Transforming never fails and never
/// changes the fitted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    schema: FeatureSchema,
    numeric: Vec<NumericColumn>,
    categorical: Vec<CategoricalColumn>,
}

impl FittedPreprocessor {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn numeric_columns(&self) -> &[NumericColumn] {
        &self.numeric
    }

    pub fn categorical_columns(&self) -> &[CategoricalColumn] {
        &self.categorical
    }

    /// Length of every vector this pipeline produces
    pub fn output_dim(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.encoder.width()).sum::<usize>()
    }

    /// Transform one record
    pub fn transform(&self, record: &VehicleRecord) -> FeatureVector {
        let mut out = Vec::with_capacity(self.output_dim());
        for column in &self.numeric {
            out.push(column.transform(record));
        }
        for column in &self.categorical {
            let category = record
                .get_text(&column.name)
                .unwrap_or_else(|| column.mode.clone());
            column.encoder.encode_into(&category, &mut out);
        }
        FeatureVector::new(out)
    }

    /// Transform every row of a table, in order
    pub fn transform_table(&self, table: &Table) -> Vec<FeatureVector> {
        table.rows().iter().map(|r| self.transform(r)).collect()
    }

    /// Output feature names: numeric column names, then `column=category`
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|c| c.name.clone()).collect();
        for column in &self.categorical {
            names.extend(
                column
                    .encoder
                    .categories
                    .iter()
                    .map(|cat| format!("{}={}", column.name, cat)),
            );
        }
        names
    }

    /// Source column of each output slot
    pub fn source_columns(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self.numeric.iter().map(|c| c.name.as_str()).collect();
        for column in &self.categorical {
            sources.extend(std::iter::repeat(column.name.as_str()).take(column.encoder.width()));
        }
        sources
    }

    /// Check state loaded from outside (e.g. a model artifact) is usable and
    /// agrees with the schema it carries
    pub fn validate(&self) -> Result<()> {
        self.schema.validate()?;

        let numeric_names: Vec<&String> = self.numeric.iter().map(|c| &c.name).collect();
        let categorical_names: Vec<&String> = self.categorical.iter().map(|c| &c.name).collect();
        if numeric_names != self.schema.numeric.iter().collect::<Vec<_>>()
            || categorical_names != self.schema.categorical.iter().collect::<Vec<_>>()
        {
            return Err(FeatureError::InvalidFittedState {
                column: "*".to_string(),
                reason: "fitted columns do not match the schema".to_string(),
            });
        }

        for column in &self.numeric {
            if !column.median.is_finite() || !column.scaler.is_valid() {
                return Err(FeatureError::InvalidFittedState {
                    column: column.name.clone(),
                    reason: "non-finite median or non-positive scale".to_string(),
                });
            }
        }
        for column in &self.categorical {
            if column.encoder.width() == 0 || column.encoder.has_duplicates() {
                return Err(FeatureError::InvalidFittedState {
                    column: column.name.clone(),
                    reason: "category list is empty or has duplicates".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carscope_core::FieldValue;

    fn training() -> Table {
        let csv = "name,year,price,cylinders,mileage,doors,make,body,description\n\
            a,2018,15000,4,30,4,Toyota,Sedan,one\n\
            b,2020,25000,6,,2,Ford,Coupe,two\n\
            c,2022,35000,,20,4,Toyota,,three\n";
        Table::from_csv_bytes(csv.as_bytes()).unwrap()
    }

    fn small_schema() -> FeatureSchema {
        FeatureSchema::new(
            ["year", "price", "cylinders", "mileage"],
            ["make", "body", "doors"],
        )
    }

    fn fitted() -> FittedPreprocessor {
        Preprocessor::new(small_schema()).fit(&training()).unwrap()
    }

    #[test]
    fn test_output_layout() {
        let pre = fitted();
        // 4 numeric + make{Ford,Toyota} + body{Coupe,Sedan} + doors{2,4}
        assert_eq!(pre.output_dim(), 10);
        assert_eq!(
            pre.feature_names(),
            vec![
                "year", "price", "cylinders", "mileage", "make=Ford", "make=Toyota",
                "body=Coupe", "body=Sedan", "doors=2", "doors=4"
            ]
        );
        assert_eq!(pre.source_columns()[5], "make");
    }

    #[test]
    fn test_fitted_statistics() {
        let pre = fitted();
        let year = &pre.numeric_columns()[0];
        assert_eq!(year.median, 2020.0);
        assert_eq!(year.scaler.mean, 2020.0);

        // cylinders observed [4, 6] -> median 5, imputed column [4, 6, 5]
        let cylinders = &pre.numeric_columns()[2];
        assert_eq!(cylinders.median, 5.0);
        assert_eq!(cylinders.scaler.mean, 5.0);

        // body observed [Sedan, Coupe] ties -> smallest, "Coupe"
        assert_eq!(pre.categorical_columns()[1].mode, "Coupe");
    }

    #[test]
    fn test_missing_numeric_becomes_standardized_median() {
        let pre = fitted();
        let record = VehicleRecord::new().with("make", "Toyota");
        let v = pre.transform(&record);
        for (i, column) in pre.numeric_columns().iter().enumerate() {
            assert_eq!(v.as_slice()[i], column.scaler.transform(column.median));
        }
    }

    #[test]
    fn test_unknown_category_all_zero_same_width() {
        let pre = fitted();
        let known = pre.transform(&VehicleRecord::new().with("make", "Ford"));
        let unknown = pre.transform(&VehicleRecord::new().with("make", "Lada"));
        assert_eq!(known.dim(), unknown.dim());
        assert_eq!(&known.as_slice()[4..6], &[1.0, 0.0]);
        assert_eq!(&unknown.as_slice()[4..6], &[0.0, 0.0]);
    }

    #[test]
    fn test_missing_category_uses_mode() {
        let pre = fitted();
        let v = pre.transform(&VehicleRecord::new());
        // make mode is Toyota
        assert_eq!(&v.as_slice()[4..6], &[0.0, 1.0]);
        // doors mode is "4"
        assert_eq!(&v.as_slice()[8..10], &[0.0, 1.0]);
    }

    #[test]
    fn test_numeric_doors_match_text_category() {
        let pre = fitted();
        let a = pre.transform(&VehicleRecord::new().with("doors", 2.0));
        let b = pre.transform(&VehicleRecord::new().with("doors", "2"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_extra_columns_ignored_and_deterministic() {
        let pre = fitted();
        let base = VehicleRecord::new().with("year", 2019.0).with("make", "Ford");
        let extra = base.clone().with("description", "ignored").with("vin", "XYZ");
        let first = pre.transform(&base);
        assert_eq!(first, pre.transform(&extra));
        assert_eq!(first, pre.transform(&base));
        assert_eq!(
            first.as_slice().iter().map(|x| x.to_bits()).collect::<Vec<_>>(),
            pre.transform(&base).as_slice().iter().map(|x| x.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_fit_errors() {
        let empty = Table::from_csv_bytes(b"year,make\n").unwrap();
        assert_eq!(
            Preprocessor::new(FeatureSchema::new(["year"], ["make"])).fit(&empty),
            Err(FeatureError::EmptyTrainingSet)
        );

        let no_values = Table::from_csv_bytes(b"year,make\n,Ford\n").unwrap();
        assert_eq!(
            Preprocessor::new(FeatureSchema::new(["year"], ["make"])).fit(&no_values),
            Err(FeatureError::NoObservedValues("year".to_string()))
        );

        assert_eq!(
            Preprocessor::new(FeatureSchema::new(["engine_size"], Vec::<&str>::new()))
                .fit(&training()),
            Err(FeatureError::MissingColumn("engine_size".to_string()))
        );
    }

    #[test]
    fn test_serde_roundtrip_preserves_transform() {
        let pre = fitted();
        let json = serde_json::to_string(&pre).unwrap();
        let restored: FittedPreprocessor = serde_json::from_str(&json).unwrap();
        assert!(restored.validate().is_ok());

        let record = VehicleRecord::new()
            .with("year", 2021.0)
            .with("mileage", FieldValue::Missing)
            .with("body", "Sedan");
        assert_eq!(pre.transform(&record), restored.transform(&record));
    }

    #[test]
    fn test_validate_rejects_bad_state() {
        let mut pre = fitted();
        pre.numeric[0].scaler.scale = 0.0;
        assert!(matches!(
            pre.validate(),
            Err(FeatureError::InvalidFittedState { column, .. }) if column == "year"
        ));
    }
}
