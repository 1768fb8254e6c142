use serde::{Deserialize, Serialize};

/// A fixed-width numeric feature vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FeatureVector {
    data: Vec<f64>,
}

impl FeatureVector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f64>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Squared Euclidean distance; infinite when dimensions differ
    #[inline]
    pub fn squared_l2_distance(&self, other: &FeatureVector) -> f64 {
        squared_l2(&self.data, &other.data)
    }

    /// Euclidean distance; infinite when dimensions differ
    #[inline]
    pub fn l2_distance(&self, other: &FeatureVector) -> f64 {
        self.squared_l2_distance(other).sqrt()
    }
}

/// Squared Euclidean distance between two slices
#[inline]
pub fn squared_l2(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
