//! Regression tree inference

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};

/// A node of a fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        #[serde(default)]
        n_samples: usize,
        #[serde(default)]
        impurity: f64,
    },
    /// Internal node: `x[feature_idx] <= threshold` goes left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        #[serde(default)]
        n_samples: usize,
        #[serde(default)]
        impurity: f64,
    },
}

impl TreeNode {
    fn n_samples(&self) -> usize {
        match self {
            TreeNode::Leaf { n_samples, .. } | TreeNode::Split { n_samples, .. } => *n_samples,
        }
    }

    fn impurity(&self) -> f64 {
        match self {
            TreeNode::Leaf { impurity, .. } | TreeNode::Split { impurity, .. } => *impurity,
        }
    }
}

/// A fitted regression tree over a fixed-width feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub n_features: usize,
    pub root: TreeNode,
    /// Stored importances; derived from the splits when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<Vec<f64>>,
}

impl RegressionTree {
    pub fn new(n_features: usize, root: TreeNode) -> Self {
        Self {
            n_features,
            root,
            feature_importances: None,
        }
    }

    pub fn predict_one(&self, sample: &[f64]) -> Result<f64> {
        if sample.len() != self.n_features {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features,
                actual: sample.len(),
            });
        }
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return Ok(*value),
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if sample[*feature_idx] <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
            }
        }
    }

    /// Every split index is within `n_features` and every value is finite
    pub fn validate(&self) -> Result<()> {
        if let Some(importances) = &self.feature_importances {
            if importances.len() != self.n_features {
                return Err(ModelError::Invalid(format!(
                    "{} feature importances for {} features",
                    importances.len(),
                    self.n_features
                )));
            }
        }
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            match node {
                TreeNode::Leaf { value, .. } => {
                    if !value.is_finite() {
                        return Err(ModelError::Invalid("non-finite leaf value".to_string()));
                    }
                }
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature_idx >= self.n_features {
                        return Err(ModelError::Invalid(format!(
                            "split on feature {} but the tree has {} features",
                            feature_idx, self.n_features
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(ModelError::Invalid("NaN split threshold".to_string()));
                    }
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        Ok(())
    }

    /// Importance per feature, normalized to sum to 1.
    ///
    /// Uses the stored vector when present, otherwise the weighted impurity
    /// decrease of each split. All zeros when no split reduces impurity.
    pub fn feature_importances(&self) -> Vec<f64> {
        let raw = match &self.feature_importances {
            Some(stored) => stored.clone(),
            None => self.impurity_importances(),
        };
        let total: f64 = raw.iter().sum();
        if total > 0.0 {
            raw.iter().map(|v| v / total).collect()
        } else {
            vec![0.0; self.n_features]
        }
    }

    fn impurity_importances(&self) -> Vec<f64> {
        let mut importances = vec![0.0; self.n_features];
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            if let TreeNode::Split {
                feature_idx,
                left,
                right,
                n_samples,
                impurity,
                ..
            } = node
            {
                let decrease = *n_samples as f64 * impurity
                    - left.n_samples() as f64 * left.impurity()
                    - right.n_samples() as f64 * right.impurity();
                if let Some(slot) = importances.get_mut(*feature_idx) {
                    *slot += decrease.max(0.0);
                }
                stack.push(left);
                stack.push(right);
            }
        }
        importances
    }

    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        node_depth(&self.root)
    }

    pub fn n_leaves(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count(left) + count(right),
            }
        }
        count(&self.root)
    }
}
