//! Tree ensembles - gradient-boosted and random-forest classifiers
//!
//! Trees are stored as flat node arenas (node 0 is the root), the layout
//! exported by both XGBoost and scikit-learn.

use serde::{Deserialize, Serialize};

use super::{sigmoid, InferenceError};

// ============================================================================
// NODES
// ============================================================================

/// Comparison used to route a record to the left child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SplitRule {
    /// `x < threshold` (XGBoost)
    #[default]
    Lt,
    /// `x <= threshold` (scikit-learn)
    Le,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Child taken when the feature value is NaN
        missing: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Training sample weight that reached this node
    pub cover: Option<f64>,
    /// Loss reduction of the split (splits only)
    pub gain: Option<f64>,
}

impl Node {
    pub fn leaf(value: f64, cover: Option<f64>) -> Self {
        Self { kind: NodeKind::Leaf { value }, cover, gain: None }
    }

    pub fn split(feature: usize, threshold: f64, left: usize, right: usize, cover: Option<f64>) -> Self {
        Self {
            kind: NodeKind::Split { feature, threshold, left, right, missing: left },
            cover,
            gain: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Build a tree, checking that the node graph is a proper tree rooted at
    /// node 0 whose splits only reference features below `n_features`.
    pub fn new(nodes: Vec<Node>, n_features: usize) -> Result<Self, String> {
        if nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        let mut visited = vec![false; nodes.len()];
        let mut stack = vec![0usize];

        while let Some(index) = stack.pop() {
            if visited[index] {
                return Err(format!("node {} is reachable more than once", index));
            }
            visited[index] = true;

            if let NodeKind::Split { feature, left, right, missing, threshold } = nodes[index].kind {
                if feature >= n_features {
                    return Err(format!(
                        "node {} splits on feature {} but the model has {} features",
                        index, feature, n_features
                    ));
                }
                if threshold.is_nan() {
                    return Err(format!("node {} has a NaN threshold", index));
                }
                for child in [left, right] {
                    if child >= nodes.len() {
                        return Err(format!("node {} points to missing child {}", index, child));
                    }
                    stack.push(child);
                }
                if missing != left && missing != right {
                    return Err(format!("node {} has a missing branch that is not a child", index));
                }
            }
        }

        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Child of `index` that `x` follows. Caller guarantees `index` is a split.
    pub fn next_node(&self, index: usize, x: &[f64], rule: SplitRule) -> usize {
        match self.nodes[index].kind {
            NodeKind::Split { feature, threshold, left, right, missing } => {
                let value = x[feature];
                if value.is_nan() {
                    missing
                } else {
                    let goes_left = match rule {
                        SplitRule::Lt => value < threshold,
                        SplitRule::Le => value <= threshold,
                    };
                    if goes_left { left } else { right }
                }
            }
            NodeKind::Leaf { .. } => index,
        }
    }

    /// Index of the leaf `x` lands in
    pub fn leaf_index(&self, x: &[f64], rule: SplitRule) -> usize {
        let mut index = 0;
        while !self.nodes[index].is_leaf() {
            index = self.next_node(index, x, rule);
        }
        index
    }

    pub fn predict(&self, x: &[f64], rule: SplitRule) -> f64 {
        match self.nodes[self.leaf_index(x, rule)].kind {
            NodeKind::Leaf { value } => value,
            NodeKind::Split { .. } => unreachable!("leaf_index always stops on a leaf"),
        }
    }
}

// ============================================================================
// ENSEMBLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnsembleKind {
    /// Sum of leaf values on top of a base margin, squashed by a sigmoid
    GradientBoosting { base_margin: f64 },
    /// Mean of per-tree positive-class probabilities
    RandomForest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsemble {
    pub type_name: String,
    pub kind: EnsembleKind,
    pub trees: Vec<Tree>,
    pub n_features: usize,
    pub split_rule: SplitRule,
    pub feature_importances: Vec<f64>,
}

impl TreeEnsemble {
    pub fn new(
        type_name: String,
        kind: EnsembleKind,
        trees: Vec<Tree>,
        n_features: usize,
        split_rule: SplitRule,
        feature_importances: Option<Vec<f64>>,
    ) -> Self {
        let feature_importances =
            feature_importances.unwrap_or_else(|| derive_importances(&trees, n_features));

        Self { type_name, kind, trees, n_features, split_rule, feature_importances }
    }

    fn check_width(&self, x: &[f64]) -> Result<(), InferenceError> {
        if x.len() != self.n_features {
            return Err(InferenceError::FeatureCountMismatch {
                expected: self.n_features,
                actual: x.len(),
            });
        }
        Ok(())
    }

    /// Raw model output: log-odds for boosting, probability for forests
    pub fn raw_output(&self, x: &[f64]) -> Result<f64, InferenceError> {
        self.check_width(x)?;

        let total: f64 = self.trees.iter().map(|tree| tree.predict(x, self.split_rule)).sum();
        let output = match self.kind {
            EnsembleKind::GradientBoosting { base_margin } => base_margin + total,
            EnsembleKind::RandomForest => total / self.trees.len().max(1) as f64,
        };

        if !output.is_finite() {
            return Err(InferenceError::NonFinite(output));
        }
        Ok(output)
    }

    pub fn predict_proba(&self, x: &[f64]) -> Result<f64, InferenceError> {
        let output = self.raw_output(x)?;
        Ok(match self.kind {
            EnsembleKind::GradientBoosting { .. } => sigmoid(output),
            EnsembleKind::RandomForest => output,
        })
    }
}

/// Gain-based importances when every split carries a gain, split counts
/// otherwise. Normalized to sum to 1.
fn derive_importances(trees: &[Tree], n_features: usize) -> Vec<f64> {
    let splits = || {
        trees.iter().flat_map(|tree| tree.nodes.iter()).filter_map(|node| match node.kind {
            NodeKind::Split { feature, .. } => Some((feature, node.gain)),
            NodeKind::Leaf { .. } => None,
        })
    };

    let use_gain = splits().all(|(_, gain)| gain.is_some());
    let mut totals = vec![0.0; n_features];
    for (feature, gain) in splits() {
        totals[feature] += if use_gain { gain.unwrap_or(0.0) } else { 1.0 };
    }

    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }
    totals
}
