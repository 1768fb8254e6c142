use serde::{Deserialize, Serialize};

/// Zero-mean, unit-variance scaling with statistics from the training column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: f64,
    /// Population standard deviation, or 1.0 for a constant column
    pub scale: f64,
}

impl StandardScaler {
    /// Fit on fully imputed values. An empty slice yields the identity scaler.
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self { mean: 0.0, scale: 1.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        Self {
            mean,
            scale: if std > f64::EPSILON * mean.abs().max(1.0) { std } else { 1.0 },
        }
    }

    #[inline]
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    pub fn is_valid(&self) -> bool {
        self.mean.is_finite() && self.scale.is_finite() && self.scale > 0.0
    }
}
