//! Descriptive analytics over the vehicle dataset
//!
//! Everything here is read-only over a [`Dataset`] or [`Table`] and returns
//! plain serializable data that a client can chart directly.

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::record::{columns, VehicleRecord};
use crate::table::Table;
use crate::value::format_thousands;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Columns a price trend may be grouped by
pub const TREND_FEATURES: &[&str] = &[
    columns::MAKE,
    columns::YEAR,
    columns::BODY,
    columns::FUEL,
    columns::DRIVETRAIN,
];

/// Brand value that disables the brand filter
pub const ALL_BRANDS: &str = "All";

/// Default number of rows in a browse window
pub const DEFAULT_BROWSE_ROWS: usize = 50;

/// Default number of columns shown when browsing
pub const DEFAULT_BROWSE_COLUMNS: usize = 10;

/// Filters for exploring the dataset by brand, price and free text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleFilter {
    /// Exact make, or `"All"` / `None` for any
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    /// Case-insensitive substring of `model`
    #[serde(default)]
    pub model_query: Option<String>,
    /// Case-insensitive substring of `description`
    #[serde(default)]
    pub description_query: Option<String>,
}

impl VehicleFilter {
    pub fn matches(&self, record: &VehicleRecord) -> bool {
        let price = match record.get_f64(columns::PRICE) {
            Some(p) => p,
            None => return false,
        };
        if self.min_price.is_some_and(|min| price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| price > max) {
            return false;
        }

        if let Some(brand) = self.brand.as_deref().filter(|b| !b.is_empty() && *b != ALL_BRANDS) {
            if record.get_text(columns::MAKE).as_deref() != Some(brand) {
                return false;
            }
        }

        substring_matches(record, columns::MODEL, self.model_query.as_deref())
            && substring_matches(record, columns::DESCRIPTION, self.description_query.as_deref())
    }
}

fn substring_matches(record: &VehicleRecord, column: &str, query: Option<&str>) -> bool {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        None => true,
        Some(q) => record.get(column).contains_ignore_case(&q.to_lowercase()),
    }
}

/// A dataset row returned by a search
#[derive(Debug, Clone, Serialize)]
pub struct VehicleMatch {
    /// Row index in the dataset
    pub index: usize,
    /// `"2020 Toyota Camry - $20,000"`
    pub label: String,
    pub record: VehicleRecord,
}

/// Display label used when listing search results
pub fn vehicle_label(record: &VehicleRecord) -> String {
    let price = record
        .get_f64(columns::PRICE)
        .map(|p| format_thousands(p, 0))
        .unwrap_or_default();
    format!("{} - ${}", record.title(), price)
}

/// Rows matching `filter`, in dataset order
pub fn search(dataset: &Dataset, filter: &VehicleFilter) -> Vec<VehicleMatch> {
    dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, r)| filter.matches(r))
        .map(|(index, r)| VehicleMatch {
            index,
            label: vehicle_label(r),
            record: r.clone(),
        })
        .collect()
}

/// Choices offered by the prediction form
#[derive(Debug, Clone, Serialize)]
pub struct FormOptions {
    pub makes: Vec<String>,
    pub models: Vec<String>,
    pub bodies: Vec<String>,
    pub transmissions: Vec<String>,
    pub drivetrains: Vec<String>,
    pub year_range: Option<(f64, f64)>,
    pub price_range: Option<(f64, f64)>,
}

pub fn form_options(dataset: &Dataset) -> FormOptions {
    let table = dataset.table();
    FormOptions {
        makes: distinct_values(table, columns::MAKE),
        models: distinct_values(table, columns::MODEL),
        bodies: distinct_values(table, columns::BODY),
        transmissions: distinct_values(table, columns::TRANSMISSION),
        drivetrains: distinct_values(table, columns::DRIVETRAIN),
        year_range: min_max(&table.numeric_column(columns::YEAR)),
        price_range: min_max(&table.numeric_column(columns::PRICE))
            .map(|(lo, hi)| (lo.trunc(), hi.trunc())),
    }
}

/// Sorted distinct non-missing values of a column
pub fn distinct_values(table: &Table, column: &str) -> Vec<String> {
    table
        .rows()
        .iter()
        .filter_map(|r| r.get_text(column))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let min = values.iter().copied().min_by(f64::total_cmp)?;
    let max = values.iter().copied().max_by(f64::total_cmp)?;
    Some((min, max))
}

/// Mean of a numeric column per group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub group: String,
    pub mean: f64,
    pub count: usize,
}

/// Mean of `value_column` per distinct `group_column`, sorted ascending by
/// mean. Rows missing either side are skipped.
pub fn grouped_mean(table: &Table, group_column: &str, value_column: &str) -> Vec<GroupMean> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for row in table.rows() {
        if let (Some(key), Some(v)) = (row.get_text(group_column), row.get_f64(value_column)) {
            let entry = sums.entry(key).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
    }
    let mut means: Vec<GroupMean> = sums
        .into_iter()
        .map(|(group, (sum, count))| GroupMean {
            group,
            mean: sum / count as f64,
            count,
        })
        .collect();
    means.sort_by(|a, b| a.mean.total_cmp(&b.mean));
    means
}

/// Mean price per value of one of [`TREND_FEATURES`]
pub fn price_trend(dataset: &Dataset, feature: &str) -> Result<Vec<GroupMean>> {
    if !TREND_FEATURES.contains(&feature) {
        return Err(Error::UnsupportedColumn(feature.to_string()));
    }
    if !dataset.table().has_column(feature) {
        return Err(Error::ColumnNotFound(feature.to_string()));
    }
    Ok(grouped_mean(dataset.table(), feature, columns::PRICE))
}

/// Summary statistics of a numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescribeStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; absent with fewer than two values
    pub std: Option<f64>,
    pub min: f64,
    #[serde(rename = "25%")]
    pub q25: f64,
    #[serde(rename = "50%")]
    pub q50: f64,
    #[serde(rename = "75%")]
    pub q75: f64,
    pub max: f64,
}

pub fn describe(values: &[f64]) -> Result<DescribeStats> {
    if values.is_empty() {
        return Err(Error::EmptyDataset);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = (n > 1).then(|| {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    });

    Ok(DescribeStats {
        count: n,
        mean,
        std,
        min: sorted[0],
        q25: quantile_sorted(&sorted, 0.25),
        q50: quantile_sorted(&sorted, 0.50),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted[n - 1],
    })
}

/// Linear-interpolated quantile of an already sorted, non-empty slice
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn price_stats(dataset: &Dataset) -> Result<DescribeStats> {
    describe(&dataset.prices())
}

/// One bar of a histogram, `[start, end)` except the last bin which is closed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    /// Equal-width histogram over the finite values. No values gives no bins.
    pub fn build(values: &[f64], n_bins: usize) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let (mut lo, mut hi) = match min_max(&finite) {
            Some(range) if n_bins > 0 => range,
            _ => return Self::default(),
        };
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / n_bins as f64;
        let mut bins: Vec<HistogramBin> = (0..n_bins)
            .map(|i| HistogramBin {
                start: lo + width * i as f64,
                end: if i + 1 == n_bins { hi } else { lo + width * (i + 1) as f64 },
                count: 0,
            })
            .collect();

        for v in finite {
            let idx = (((v - lo) / width) as usize).min(n_bins - 1);
            bins[idx].count += 1;
        }
        Self { bins }
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// A window onto the dataset for the browse view
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowseRequest {
    #[serde(default)]
    pub start: usize,
    /// Exclusive; defaults to `start + 50`, clamped to the row count
    #[serde(default)]
    pub end: Option<usize>,
    /// Case-insensitive match against every cell of a row
    #[serde(default)]
    pub search: Option<String>,
    /// Columns to include; defaults to the first ten
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

pub fn browse(dataset: &Dataset, request: &BrowseRequest) -> Result<Table> {
    let table = dataset.table();

    let selected: Vec<String> = match &request.columns {
        Some(cols) if !cols.is_empty() => cols.clone(),
        _ => table
            .columns()
            .iter()
            .take(DEFAULT_BROWSE_COLUMNS)
            .cloned()
            .collect(),
    };

    let matched = match request.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => {
            let needle = term.to_lowercase();
            table.filter(|row| {
                table
                    .columns()
                    .iter()
                    .any(|c| row.get(c).contains_ignore_case(&needle))
            })
        }
        None => table.clone(),
    };

    let end = request
        .end
        .unwrap_or(request.start.saturating_add(DEFAULT_BROWSE_ROWS))
        .min(matched.len());
    let start = request.start.min(end);
    if request.end.is_some_and(|e| e < request.start) {
        return Err(Error::InvalidRange {
            start: request.start,
            end: request.end.unwrap_or_default(),
        });
    }

    let (cols, rows) = matched.into_parts();
    let window = Table::new(cols, rows[start..end].to_vec());
    window.select(&selected)
}

/// Per-column metadata
#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    /// `float64` when every present cell is numeric, otherwise `object`
    pub dtype: &'static str,
    pub non_null: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub rows: usize,
    pub columns: usize,
    pub size_kib: Option<f64>,
    pub last_updated: Option<String>,
    pub column_info: Vec<ColumnInfo>,
}

pub fn dataset_info(dataset: &Dataset) -> DatasetInfo {
    let table = dataset.table();
    let column_info = table
        .columns()
        .iter()
        .map(|name| {
            let present: Vec<_> = table
                .rows()
                .iter()
                .map(|r| r.get(name))
                .filter(|v| !v.is_missing())
                .collect();
            let numeric = present.iter().all(|v| v.as_f64().is_some());
            ColumnInfo {
                name: name.clone(),
                dtype: if numeric { "float64" } else { "object" },
                non_null: present.len(),
            }
        })
        .collect();

    DatasetInfo {
        rows: dataset.len(),
        columns: table.columns().len(),
        size_kib: dataset.source().map(|s| s.size_kib()),
        last_updated: dataset.source().and_then(|s| s.modified_label()),
        column_info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let csv = "name,make,model,year,price,fuel,body,description\n\
            a,Toyota,Camry,2020,20000,Gasoline,Sedan,Clean one owner\n\
            b,Toyota,RAV4,2021,28000,Hybrid,SUV,Great mileage\n\
            c,Ford,F-150,2019,35000,Gasoline,Pickup,Tow package\n\
            d,BMW,X5,2022,61000,Gasoline,SUV,Luxury package\n";
        Dataset::from_table(Table::from_csv_bytes(csv.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn test_search_by_brand_and_range() {
        let ds = sample();
        let filter = VehicleFilter {
            brand: Some("Toyota".to_string()),
            min_price: Some(21000.0),
            max_price: Some(30000.0),
            ..Default::default()
        };
        let hits = search(&ds, &filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 1);
        assert_eq!(hits[0].label, "2021 Toyota RAV4 - $28,000");
    }

    #[test]
    fn test_search_all_brands_and_text() {
        let ds = sample();
        let filter = VehicleFilter {
            brand: Some(ALL_BRANDS.to_string()),
            description_query: Some("PACKAGE".to_string()),
            ..Default::default()
        };
        let idx: Vec<usize> = search(&ds, &filter).iter().map(|m| m.index).collect();
        assert_eq!(idx, vec![2, 3]);

        let by_model = VehicleFilter {
            model_query: Some("f-1".to_string()),
            ..Default::default()
        };
        assert_eq!(search(&ds, &by_model).len(), 1);
    }

    #[test]
    fn test_form_options() {
        let opts = form_options(&sample());
        assert_eq!(opts.makes, vec!["BMW", "Ford", "Toyota"]);
        assert_eq!(opts.year_range, Some((2019.0, 2022.0)));
        assert_eq!(opts.price_range, Some((20000.0, 61000.0)));
    }

    #[test]
    fn test_price_trend_sorted() {
        let trend = price_trend(&sample(), "make").unwrap();
        let groups: Vec<&str> = trend.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(groups, vec!["Toyota", "Ford", "BMW"]);
        assert_eq!(trend[0].mean, 24000.0);
        assert!(price_trend(&sample(), "engine").is_err());
    }

    #[test]
    fn test_describe_quantiles() {
        let stats = describe(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.q25, 1.75);
        assert_eq!(stats.q50, 2.5);
        assert_eq!(stats.q75, 3.25);
        assert!((stats.std.unwrap() - 1.2909944487358056).abs() < 1e-12);
        assert!(describe(&[]).is_err());
        assert_eq!(describe(&[5.0]).unwrap().std, None);
    }

    #[test]
    fn test_histogram() {
        let h = Histogram::build(&[0.0, 1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(h.bins.len(), 2);
        assert_eq!(h.bins[0].count, 2);
        assert_eq!(h.bins[1].count, 3);
        assert_eq!(h.total(), 5);

        assert!(Histogram::build(&[], 20).bins.is_empty());
        assert_eq!(Histogram::build(&[7.0, 7.0], 3).total(), 2);
    }

    #[test]
    fn test_browse_window_and_search() {
        let ds = sample();
        let all = browse(&ds, &BrowseRequest::default()).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all.columns().len(), 8);

        let req = BrowseRequest {
            start: 0,
            end: Some(1),
            search: Some("suv".to_string()),
            columns: Some(vec!["make".to_string(), "model".to_string()]),
        };
        let window = browse(&ds, &req).unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window.rows()[0].get_text("model").as_deref(), Some("RAV4"));
        assert_eq!(window.columns(), &["make", "model"]);

        let bad = BrowseRequest {
            start: 3,
            end: Some(1),
            ..Default::default()
        };
        assert!(browse(&ds, &bad).is_err());
    }

    #[test]
    fn test_browse_start_past_end_of_data() {
        let ds = sample();
        let req = BrowseRequest {
            start: usize::MAX,
            ..Default::default()
        };
        let window = browse(&ds, &req).unwrap();
        assert!(window.is_empty());
        assert_eq!(window.columns().len(), 8);
    }

    #[test]
    fn test_dataset_info() {
        let info = dataset_info(&sample());
        assert_eq!(info.rows, 4);
        let year = info.column_info.iter().find(|c| c.name == "year").unwrap();
        assert_eq!(year.dtype, "float64");
        let make = info.column_info.iter().find(|c| c.name == "make").unwrap();
        assert_eq!(make.dtype, "object");
        assert_eq!(make.non_null, 4);
    }
}
