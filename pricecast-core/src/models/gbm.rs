//! Gradient-boosted regression trees (least-squares boosting).
//!
//! Each round fits a depth-limited tree to the current residuals with
//! per-sample weights, then adds it to the ensemble scaled by the learning
//! rate. Splits maximize the weighted reduction in squared error.

use crate::error::ForecastError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// GBM hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbmParams {
    /// Number of boosting iterations (trees)
    pub n_estimators: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Minimum samples required in a leaf node
    pub min_samples_leaf: usize,
    /// Weight recent rows more heavily during training
    pub recency_weighting: bool,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 3,
            learning_rate: 0.1,
            min_samples_leaf: 1,
            recency_weighting: true,
        }
    }
}

/// Linear recency weights: `(days_since_first + 1) / (max_days + 1)`.
/// The newest row always gets weight 1.
pub fn recency_weights(dates: &[NaiveDate]) -> Vec<f64> {
    let Some(&first) = dates.first() else {
        return Vec::new();
    };
    let days: Vec<f64> = dates
        .iter()
        .map(|d| (*d - first).num_days() as f64)
        .collect();
    let max = days.iter().copied().fold(0.0, f64::max);
    days.iter().map(|d| (d + 1.0) / (max + 1.0)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single regression tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    residuals: &'a [f64],
    weights: &'a [f64],
    max_depth: usize,
    min_leaf: usize,
    nodes: Vec<TreeNode>,
}

impl<'a> TreeBuilder<'a> {
    fn leaf_value(&self, idx: &[usize]) -> f64 {
        let (s, w) = idx.iter().fold((0.0, 0.0), |(s, w), &i| {
            (s + self.weights[i] * self.residuals[i], w + self.weights[i])
        });
        if w > 0.0 {
            s / w
        } else {
            0.0
        }
    }

    fn best_split(&self, idx: &[usize]) -> Option<SplitCandidate> {
        let n_features = self.x[idx[0]].len();
        let (total_s, total_w) = idx.iter().fold((0.0, 0.0), |(s, w), &i| {
            (s + self.weights[i] * self.residuals[i], w + self.weights[i])
        });
        if total_w <= 0.0 {
            return None;
        }
        let parent_score = total_s * total_s / total_w;

        let mut best: Option<SplitCandidate> = None;
        let mut order = idx.to_vec();
        for feature in 0..n_features {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));
            let (mut left_s, mut left_w) = (0.0, 0.0);
            for pos in 0..order.len() - 1 {
                let i = order[pos];
                left_s += self.weights[i] * self.residuals[i];
                left_w += self.weights[i];
                let left_n = pos + 1;
                let right_n = order.len() - left_n;
                if left_n < self.min_leaf || right_n < self.min_leaf {
                    continue;
                }
                let here = self.x[i][feature];
                let next = self.x[order[pos + 1]][feature];
                if next <= here {
                    continue;
                }
                let right_s = total_s - left_s;
                let right_w = total_w - left_w;
                if left_w <= 0.0 || right_w <= 0.0 {
                    continue;
                }
                let gain =
                    left_s * left_s / left_w + right_s * right_s / right_w - parent_score;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }

    fn build(&mut self, idx: Vec<usize>, depth: usize) -> usize {
        let node_id = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            value: self.leaf_value(&idx),
        });
        if depth >= self.max_depth || idx.len() < 2 * self.min_leaf.max(1) {
            return node_id;
        }
        let Some(split) = self.best_split(&idx) else {
            return node_id;
        };
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);
        let left = self.build(left_idx, depth + 1);
        let right = self.build(right_idx, depth + 1);
        self.nodes[node_id] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }
}

impl RegressionTree {
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut node = 0;
        loop {
            match self.nodes.get(node) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = row.get(*feature).copied().unwrap_or(f64::NAN);
                    node = if v <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], id: usize) -> usize {
            match &nodes[id] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

/// Boosted ensemble of regression trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbmRegressor {
    pub params: GbmParams,
    pub n_features: usize,
    base_score: f64,
    trees: Vec<RegressionTree>,
}

impl GbmRegressor {
    /// Fit on row-major `x` against `y` with per-row `weights`.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        weights: &[f64],
        params: GbmParams,
    ) -> Result<Self, ForecastError> {
        let n = x.len();
        if n == 0 {
            return Err(ForecastError::InsufficientHistory {
                required: 1,
                available: 0,
            });
        }
        if y.len() != n || weights.len() != n {
            return Err(ForecastError::InvalidInput(format!(
                "gbm inputs disagree: {n} rows, {} targets, {} weights",
                y.len(),
                weights.len()
            )));
        }
        let n_features = x[0].len();
        if x.iter().any(|r| r.len() != n_features) {
            return Err(ForecastError::InvalidInput("ragged feature rows".into()));
        }
        if x.iter().flatten().chain(y).any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidInput(
                "non-finite values in training data".into(),
            ));
        }

        let total_w: f64 = weights.iter().sum();
        let base_score = if total_w > 0.0 {
            y.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total_w
        } else {
            y.iter().sum::<f64>() / n as f64
        };

        let mut preds = vec![base_score; n];
        let mut trees = Vec::with_capacity(params.n_estimators);
        for round in 0..params.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&preds).map(|(t, p)| t - p).collect();
            let mut builder = TreeBuilder {
                x,
                residuals: &residuals,
                weights,
                max_depth: params.max_depth,
                min_leaf: params.min_samples_leaf,
                nodes: Vec::new(),
            };
            builder.build((0..n).collect(), 0);
            let tree = RegressionTree {
                nodes: builder.nodes,
            };
            for (p, row) in preds.iter_mut().zip(x) {
                *p += params.learning_rate * tree.predict(row);
            }
            trees.push(tree);
            if round % 25 == 0 {
                let mse = y
                    .iter()
                    .zip(&preds)
                    .map(|(t, p)| (t - p).powi(2))
                    .sum::<f64>()
                    / n as f64;
                debug!(round, mse, "gbm boosting");
            }
        }

        Ok(Self {
            params,
            n_features,
            base_score,
            trees,
        })
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.base_score
            + self.params.learning_rate * self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.predict_row(r)).collect()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn max_tree_depth(&self) -> usize {
        self.trees.iter().map(RegressionTree::depth).max().unwrap_or(0)
    }
}
