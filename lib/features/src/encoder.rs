use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoding over the categories seen during fitting.
///
/// A value outside the fitted set encodes as all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Fitted categories in ascending order; position is the output slot
    pub categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit(values: impl IntoIterator<Item = String>) -> Self {
        let categories: BTreeSet<String> = values.into_iter().collect();
        Self {
            categories: categories.into_iter().collect(),
        }
    }

    /// Number of output slots
    #[inline]
    pub fn width(&self) -> usize {
        self.categories.len()
    }

    pub fn position(&self, category: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == category)
    }

    /// Append this column's indicators to `out`
    pub fn encode_into(&self, category: &str, out: &mut Vec<f64>) {
        let start = out.len();
        out.resize(start + self.width(), 0.0);
        if let Some(pos) = self.position(category) {
            out[start + pos] = 1.0;
        }
    }

    pub fn has_duplicates(&self) -> bool {
        let unique: BTreeSet<&String> = self.categories.iter().collect();
        unique.len() != self.categories.len()
    }
}
