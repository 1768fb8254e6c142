//! Nearest-vehicle lookup
//!
//! Finds the dataset row closest to a query record by Euclidean distance over
//! year, mileage, cylinders and doors. Missing or non-numeric cells count as
//! zero on both sides; this is a plain fill policy, not an estimate.

use crate::error::{FeatureError, Result};
use carscope_core::{columns, Dataset, FeatureVector, VehicleRecord};
use serde::Serialize;
use std::sync::Arc;

/// Columns compared when looking for a similar vehicle
pub const SIMILARITY_FEATURES: [&str; 4] = [
    columns::YEAR,
    columns::MILEAGE,
    columns::CYLINDERS,
    columns::DOORS,
];

/// Zero-filled numeric vector over `features`
pub fn distance_vector(record: &VehicleRecord, features: &[&str]) -> FeatureVector {
    FeatureVector::new(
        features
            .iter()
            .map(|f| record.get_f64(f).unwrap_or(0.0))
            .collect(),
    )
}

/// Index and distance of the closest point. The first of several equally
/// close points wins.
pub fn argmin_distance<'a>(
    query: &FeatureVector,
    points: impl IntoIterator<Item = &'a FeatureVector>,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, point) in points.into_iter().enumerate() {
        let d = point.l2_distance(query);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best
}

/// One compared feature of the query and its nearest match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureComparison {
    pub feature: String,
    /// Raw query value, before zero fill
    pub query: Option<f64>,
    /// Raw value on the matched row, before zero fill
    pub matched: Option<f64>,
    /// Squared difference after zero fill; these sum to `distance²`
    pub contribution: f64,
}

/// The closest dataset row to a query
#[derive(Debug, Clone, Serialize)]
pub struct NearestMatch {
    /// Row index in the dataset
    pub index: usize,
    pub distance: f64,
    /// The full matching row
    pub record: VehicleRecord,
    pub comparison: Vec<FeatureComparison>,
}

fn compare(query: &VehicleRecord, matched: &VehicleRecord, features: &[&str]) -> Vec<FeatureComparison> {
    features
        .iter()
        .map(|f| {
            let q = query.get_f64(f);
            let m = matched.get_f64(f);
            let diff = q.unwrap_or(0.0) - m.unwrap_or(0.0);
            FeatureComparison {
                feature: f.to_string(),
                query: q,
                matched: m,
                contribution: diff * diff,
            }
        })
        .collect()
}

/// Nearest-neighbour finder over a shared, immutable dataset.
///
/// Row vectors are computed once at construction; queries only scan.
#[derive(Debug, Clone)]
pub struct SimilarityFinder {
    dataset: Arc<Dataset>,
    points: Vec<FeatureVector>,
}

impl SimilarityFinder {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        let points = row_vectors(dataset.rows());
        Self { dataset, points }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Closest dataset row to `query`
    pub fn nearest(&self, query: &VehicleRecord) -> Result<NearestMatch> {
        nearest_among(self.dataset.rows(), &self.points, query)
    }
}

/// One-shot lookup without keeping a finder around
pub fn find_nearest(dataset: &Dataset, query: &VehicleRecord) -> Result<NearestMatch> {
    let points = row_vectors(dataset.rows());
    nearest_among(dataset.rows(), &points, query)
}

fn row_vectors(rows: &[VehicleRecord]) -> Vec<FeatureVector> {
    rows.iter()
        .map(|r| distance_vector(r, &SIMILARITY_FEATURES))
        .collect()
}

/// `points[i]` is the distance vector of `rows[i]`
fn nearest_among(
    rows: &[VehicleRecord],
    points: &[FeatureVector],
    query: &VehicleRecord,
) -> Result<NearestMatch> {
    let q = distance_vector(query, &SIMILARITY_FEATURES);
    let (index, distance) = argmin_distance(&q, points).ok_or(FeatureError::EmptyDataset)?;
    let record = rows[index].clone();
    let comparison = compare(query, &record, &SIMILARITY_FEATURES);
    Ok(NearestMatch {
        index,
        distance,
        record,
        comparison,
    })
}
