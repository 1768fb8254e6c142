//! Missing value imputation

use carscope_core::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    /// Replace with the median of the observed numeric values
    Median,
    /// Replace with the most frequent observed category
    MostFrequent,
}

/// Fill value learned from training data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImputeValue {
    Numeric(f64),
    Category(String),
}

impl ImputeStrategy {
    /// Learn the fill value for one column. `None` when nothing was observed.
    pub fn fit<'a>(&self, values: impl IntoIterator<Item = &'a FieldValue>) -> Option<ImputeValue> {
        match self {
            ImputeStrategy::Median => {
                let observed: Vec<f64> = values.into_iter().filter_map(FieldValue::as_f64).collect();
                median(&observed).map(ImputeValue::Numeric)
            }
            ImputeStrategy::MostFrequent => {
                most_frequent(values.into_iter().filter_map(FieldValue::category_key))
                    .map(ImputeValue::Category)
            }
        }
    }
}

/// Median of the values, averaging the middle pair for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Most frequent value; ties go to the smallest value in lexicographic order
pub fn most_frequent(values: impl IntoIterator<Item = String>) -> Option<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    // BTreeMap iterates in ascending key order, so keeping only strictly
    // greater counts leaves the smallest key among the tied maxima.
    let mut best: Option<(String, usize)> = None;
    for (value, count) in counts {
        if best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_most_frequent_tie_breaks_low() {
        let values = ["b", "a", "b", "a", "c"].map(String::from);
        assert_eq!(most_frequent(values).as_deref(), Some("a"));
        assert_eq!(most_frequent(Vec::<String>::new()), None);
    }

    #[test]
    fn test_fit_skips_missing() {
        let column = vec![
            FieldValue::Number(10.0),
            FieldValue::Missing,
            FieldValue::Number(30.0),
            FieldValue::Text("n/a".to_string()),
        ];
        assert_eq!(
            ImputeStrategy::Median.fit(&column),
            Some(ImputeValue::Numeric(20.0))
        );
        assert_eq!(
            ImputeStrategy::MostFrequent.fit(&[FieldValue::Missing, FieldValue::Number(4.0)]),
            Some(ImputeValue::Category("4".to_string()))
        );
        assert_eq!(ImputeStrategy::Median.fit(&[FieldValue::Missing]), None);
    }
}
