//! Batch prediction over uploaded CSV files

use crate::error::Result;
use crate::traits::PriceModel;
use carscope_core::analytics::grouped_mean;
use carscope_core::{columns, FieldValue, GroupMean, Histogram, Table};
use serde::Serialize;
use tracing::info;

/// Column appended to the input with the formatted prediction
pub const PREDICTION_COLUMN: &str = "Predicted_price";
pub const PREVIEW_ROWS: usize = 10;
pub const RESULT_ROWS: usize = 20;
pub const HISTOGRAM_BINS: usize = 20;

const PREDICTION_VALUE: &str = "_predicted_price_num";

/// Predictions for every row of an uploaded table
#[derive(Debug, Clone)]
pub struct BatchPrediction {
    input: Table,
    predictions: Vec<f64>,
}

/// A point of the year / predicted price chart, sized by mileage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub year: f64,
    pub predicted_price: f64,
    pub mileage: f64,
    pub make: Option<String>,
}

/// Charts over the predictions. A chart whose inputs are missing is `None`
/// and explained in `notices`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchInsights {
    pub histogram: Histogram,
    pub avg_price_by_make: Option<Vec<GroupMean>>,
    pub scatter: Option<Vec<ScatterPoint>>,
    pub notices: Vec<String>,
}

impl BatchPrediction {
    /// Parse `csv` and run the model over every row
    pub fn from_csv(model: &dyn PriceModel, csv: &[u8]) -> Result<Self> {
        let input = Table::from_csv_bytes(csv)?;
        Self::run(model, input)
    }

    pub fn run(model: &dyn PriceModel, input: Table) -> Result<Self> {
        let predictions = model.predict(&input)?;
        info!("Batch prediction completed for {} rows", predictions.len());
        Ok(Self { input, predictions })
    }

    pub fn input(&self) -> &Table {
        &self.input
    }

    pub fn predictions(&self) -> &[f64] {
        &self.predictions
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// First rows of the upload, as received
    pub fn preview(&self) -> Table {
        self.input.head(PREVIEW_ROWS)
    }

    /// The input with `Predicted_price` appended as two-decimal text
    pub fn output_table(&self) -> Table {
        let mut out = self.input.clone();
        out.push_column(
            PREDICTION_COLUMN,
            self.predictions
                .iter()
                .map(|p| FieldValue::Text(format!("{:.2}", p)))
                .collect(),
        );
        out
    }

    pub fn results(&self) -> Table {
        self.output_table().head(RESULT_ROWS)
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        Ok(self.output_table().to_csv_bytes()?)
    }

    pub fn insights(&self) -> BatchInsights {
        let mut notices = Vec::new();
        let histogram = Histogram::build(&self.predictions, HISTOGRAM_BINS);

        let avg_price_by_make = if self.input.has_column(columns::MAKE) {
            let mut numeric = self.input.clone();
            numeric.push_column(
                PREDICTION_VALUE,
                self.predictions.iter().copied().map(FieldValue::Number).collect(),
            );
            Some(grouped_mean(&numeric, columns::MAKE, PREDICTION_VALUE))
        } else {
            notices.push("No 'make' column in the upload; skipped average price by make".to_string());
            None
        };

        let scatter = if self.input.has_column(columns::YEAR)
            && self.input.has_column(columns::MILEAGE)
        {
            let points: Vec<ScatterPoint> = self
                .input
                .rows()
                .iter()
                .zip(&self.predictions)
                .filter_map(|(row, &price)| {
                    let year = row.get_f64(columns::YEAR)?;
                    let mileage = row.get_f64(columns::MILEAGE).filter(|m| *m > 0.0)?;
                    Some(ScatterPoint {
                        year,
                        predicted_price: price,
                        mileage,
                        make: row.get_text(columns::MAKE),
                    })
                })
                .collect();
            if points.is_empty() {
                notices.push("Not enough valid data for scatter plot (missing year/mileage)".to_string());
                None
            } else {
                Some(points)
            }
        } else {
            notices.push("No 'year' or 'mileage' column in the upload; skipped scatter plot".to_string());
            None
        };

        BatchInsights {
            histogram,
            avg_price_by_make,
            scatter,
            notices,
        }
    }
}
