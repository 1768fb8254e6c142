//! Derived per-vehicle features and the charts built on them

use crate::analytics::{grouped_mean, GroupMean, Histogram};
use crate::dataset::Dataset;
use crate::record::{columns, VehicleRecord};
use crate::table::Table;
use crate::value::FieldValue;
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;

/// Makes counted as luxury brands
pub const LUXURY_MAKES: &[&str] = &["BMW", "Mercedes-Benz", "Audi", "Lexus"];

pub const PRICE_PER_MILE: &str = "price_per_mile";
pub const AGE: &str = "age";
pub const LUXURY_FLAG: &str = "luxury_flag";

const PREVIEW_COLUMNS: &[&str] = &[
    columns::MAKE,
    columns::MODEL,
    columns::YEAR,
    columns::MILEAGE,
    columns::PRICE,
    PRICE_PER_MILE,
    AGE,
    LUXURY_FLAG,
];
const PREVIEW_ROWS: usize = 10;
const PRICE_PER_MILE_BINS: usize = 30;
const TOP_MAKES: usize = 10;

/// Price divided by mileage, with zero mileage counted as one
pub fn price_per_mile(record: &VehicleRecord) -> Option<f64> {
    let price = record.get_f64(columns::PRICE)?;
    let mileage = record.get_f64(columns::MILEAGE)?;
    Some(price / if mileage == 0.0 { 1.0 } else { mileage })
}

pub fn age(record: &VehicleRecord, current_year: i32) -> Option<f64> {
    record.get_f64(columns::YEAR).map(|y| current_year as f64 - y)
}

pub fn is_luxury(record: &VehicleRecord) -> bool {
    record
        .get_text(columns::MAKE)
        .is_some_and(|m| LUXURY_MAKES.contains(&m.as_str()))
}

/// Copy of the dataset table with the three derived columns appended
pub fn with_engineered_columns(dataset: &Dataset, current_year: i32) -> Table {
    let mut table = dataset.table().clone();
    let rows = dataset.rows();
    table.push_column(
        PRICE_PER_MILE,
        rows.iter().map(|r| price_per_mile(r).into()).collect(),
    );
    table.push_column(
        AGE,
        rows.iter().map(|r| age(r, current_year).into()).collect(),
    );
    table.push_column(
        LUXURY_FLAG,
        rows.iter()
            .map(|r| FieldValue::Number(if is_luxury(r) { 1.0 } else { 0.0 }))
            .collect(),
    );
    table
}

#[derive(Debug, Clone, Serialize)]
pub struct LuxurySplit {
    pub luxury: Option<f64>,
    pub non_luxury: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MakeCount {
    pub make: String,
    pub count: usize,
}

/// Engineered-feature charts for the analytics view
#[derive(Debug, Clone, Serialize)]
pub struct EngineeredInsights {
    pub current_year: i32,
    /// First rows with the derived columns, ordered as
    /// make, model, year, mileage, price, price_per_mile, age, luxury_flag
    pub preview: Vec<serde_json::Map<String, serde_json::Value>>,
    /// Mean price per age, ascending by age
    pub avg_price_by_age: Vec<GroupMean>,
    pub luxury_split: LuxurySplit,
    pub price_per_mile: Histogram,
    /// Mileage/price pairs with both present
    pub mileage_vs_price: Vec<(f64, f64)>,
    /// Ten most common makes, most frequent first
    pub top_makes: Vec<MakeCount>,
}

impl EngineeredInsights {
    pub fn compute(dataset: &Dataset, current_year: i32) -> Self {
        let table = with_engineered_columns(dataset, current_year);

        let preview_cols: Vec<String> = PREVIEW_COLUMNS
            .iter()
            .filter(|c| table.has_column(c))
            .map(|c| c.to_string())
            .collect();
        let preview = table
            .head(PREVIEW_ROWS)
            .select(&preview_cols)
            .map(|t| t.to_json_rows())
            .unwrap_or_default();

        let mut avg_price_by_age = grouped_mean(&table, AGE, columns::PRICE);
        avg_price_by_age.sort_by(|a, b| {
            let a = a.group.parse::<f64>().unwrap_or(f64::NAN);
            let b = b.group.parse::<f64>().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        });

        let luxury_means = grouped_mean(&table, LUXURY_FLAG, columns::PRICE);
        let mean_for = |flag: &str| luxury_means.iter().find(|g| g.group == flag).map(|g| g.mean);
        let luxury_split = LuxurySplit {
            luxury: mean_for("1"),
            non_luxury: mean_for("0"),
        };

        let per_mile: Vec<f64> = dataset.rows().iter().filter_map(price_per_mile).collect();

        let mileage_vs_price = dataset
            .rows()
            .iter()
            .filter_map(|r| Some((r.get_f64(columns::MILEAGE)?, r.get_f64(columns::PRICE)?)))
            .collect();

        Self {
            current_year,
            preview,
            avg_price_by_age,
            luxury_split,
            price_per_mile: Histogram::build(&per_mile, PRICE_PER_MILE_BINS),
            mileage_vs_price,
            top_makes: top_makes(dataset, TOP_MAKES),
        }
    }

    /// Compute against the local calendar year
    pub fn compute_now(dataset: &Dataset) -> Self {
        Self::compute(dataset, chrono::Local::now().year())
    }
}

/// Most frequent makes, ties broken alphabetically
pub fn top_makes(dataset: &Dataset, n: usize) -> Vec<MakeCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for make in dataset.rows().iter().filter_map(|r| r.get_text(columns::MAKE)) {
        *counts.entry(make).or_insert(0) += 1;
    }
    let mut ranked: Vec<MakeCount> = counts
        .into_iter()
        .map(|(make, count)| MakeCount { make, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.make.cmp(&b.make)));
    ranked.truncate(n);
    ranked
}
