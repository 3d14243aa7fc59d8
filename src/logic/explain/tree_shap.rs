//! Tree attribution - path-dependent TreeSHAP with a decision-path fallback
//!
//! TreeSHAP (Lundberg et al.) computes exact Shapley values of a tree's
//! conditional expectation, using node covers as the background
//! distribution. Its output in boosting ensembles is in margin (log-odds)
//! space; for forests it is in probability space, split per class.

use crate::logic::model::{Classifier, EnsembleKind, Node, NodeKind, SplitRule, Tree, TreeEnsemble};

use super::types::AttributionOutput;
use super::{Attribute, ExplainError};

/// Relative tolerance of the additivity check
const ADDITIVITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributionMethod {
    /// Exact path-dependent TreeSHAP, verified for additivity
    TreeShap,
    /// Saabas attribution: change in node expectation along the decision path
    DecisionPath,
}

/// Methods tried in order until one succeeds
pub const TREE_METHODS: [AttributionMethod; 2] = [AttributionMethod::TreeShap, AttributionMethod::DecisionPath];

#[derive(Debug, Clone)]
pub struct TreeExplainer {
    ensemble: TreeEnsemble,
    /// Cover-weighted expectation of every node, per tree
    node_values: Vec<Vec<f64>>,
    expected_value: f64,
    methods: Vec<AttributionMethod>,
}

impl TreeExplainer {
    /// Fails for non-tree models and for trees without node covers
    pub fn new(classifier: &Classifier) -> Result<Self, ExplainError> {
        let ensemble = match classifier {
            Classifier::TreeEnsemble(ensemble) => ensemble,
            Classifier::Generic(model) => return Err(ExplainError::UnsupportedModel(model.type_name.clone())),
        };
        if ensemble.trees.is_empty() {
            return Err(ExplainError::UnsupportedModel(format!("{} without trees", ensemble.type_name)));
        }

        let mut node_values = Vec::with_capacity(ensemble.trees.len());
        for (tree_index, tree) in ensemble.trees.iter().enumerate() {
            let values = expected_node_values(tree)
                .map_err(|node| ExplainError::MissingCover { tree: tree_index, node })?;
            node_values.push(values);
        }

        let root_total: f64 = node_values.iter().map(|values| values[0]).sum();
        let expected_value = match ensemble.kind {
            EnsembleKind::GradientBoosting { base_margin } => base_margin + root_total,
            EnsembleKind::RandomForest => root_total / ensemble.trees.len() as f64,
        };

        Ok(Self {
            ensemble: ensemble.clone(),
            node_values,
            expected_value,
            methods: TREE_METHODS.to_vec(),
        })
    }

    #[cfg(test)]
    pub fn with_methods(mut self, methods: Vec<AttributionMethod>) -> Self {
        self.methods = methods;
        self
    }

    /// Mean model output over the training data (margin or probability)
    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }

    fn attribute_with(&self, method: AttributionMethod, x: &[f64]) -> Result<AttributionOutput, ExplainError> {
        let ensemble = &self.ensemble;
        let mut phi = vec![0.0; ensemble.n_features];

        for (tree, values) in ensemble.trees.iter().zip(&self.node_values) {
            match method {
                AttributionMethod::TreeShap => {
                    let mut walk = ShapWalk { tree, rule: ensemble.split_rule, x, phi: &mut phi };
                    walk.recurse(0, Vec::new(), 1.0, 1.0, None);
                }
                AttributionMethod::DecisionPath => decision_path(tree, values, ensemble.split_rule, x, &mut phi),
            }
        }

        if ensemble.kind == EnsembleKind::RandomForest {
            let n_trees = ensemble.trees.len() as f64;
            phi.iter_mut().for_each(|v| *v /= n_trees);
        }

        if let Some(feature) = phi.iter().position(|v| !v.is_finite()) {
            return Err(ExplainError::NonFinite(feature));
        }

        if method == AttributionMethod::TreeShap {
            let output = ensemble.raw_output(x)?;
            let sum: f64 = phi.iter().sum();
            let expected = output - self.expected_value;
            if (sum - expected).abs() > ADDITIVITY_TOLERANCE * (1.0 + output.abs()) {
                return Err(ExplainError::Additivity { sum, expected });
            }
        }

        Ok(match ensemble.kind {
            EnsembleKind::GradientBoosting { .. } => AttributionOutput::Single(phi),
            EnsembleKind::RandomForest => {
                let negative = phi.iter().map(|v| -v).collect();
                AttributionOutput::PerClass(vec![negative, phi])
            }
        })
    }
}

impl Attribute for TreeExplainer {
    fn attribute(&self, x: &[f64]) -> Result<AttributionOutput, ExplainError> {
        if x.len() != self.ensemble.n_features {
            return Err(ExplainError::FeatureCountMismatch {
                expected: self.ensemble.n_features,
                actual: x.len(),
            });
        }

        let mut last_error = None;
        for method in &self.methods {
            match self.attribute_with(*method, x) {
                Ok(output) => return Ok(output),
                Err(err) => {
                    tracing::debug!("{:?} attribution failed: {}", method, err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or(ExplainError::NoMethods))
    }
}

fn cover(node: &Node) -> f64 {
    node.cover.unwrap_or(0.0)
}

/// Cover-weighted expectation of every node. Errors with the index of the
/// first node lacking a positive, finite cover.
fn expected_node_values(tree: &Tree) -> Result<Vec<f64>, usize> {
    if let Some(index) = tree.nodes().iter().position(|n| !matches!(n.cover, Some(c) if c.is_finite() && c > 0.0)) {
        return Err(index);
    }

    fn fill(tree: &Tree, index: usize, values: &mut [f64]) -> f64 {
        let value = match tree.node(index).kind {
            NodeKind::Leaf { value } => value,
            NodeKind::Split { left, right, .. } => {
                let left_value = fill(tree, left, values);
                let right_value = fill(tree, right, values);
                let (left_cover, right_cover) = (cover(tree.node(left)), cover(tree.node(right)));
                (left_cover * left_value + right_cover * right_value) / (left_cover + right_cover)
            }
        };
        values[index] = value;
        value
    }

    let mut values = vec![0.0; tree.nodes().len()];
    fill(tree, 0, &mut values);
    Ok(values)
}

fn decision_path(tree: &Tree, values: &[f64], rule: SplitRule, x: &[f64], phi: &mut [f64]) {
    let mut index = 0;
    while let NodeKind::Split { feature, .. } = tree.node(index).kind {
        let next = tree.next_node(index, x, rule);
        phi[feature] += values[next] - values[index];
        index = next;
    }
}

// ============================================================================
// TREESHAP
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` for the root placeholder
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

/// Append a feature to the unique path, updating permutation weights
fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let d = depth as f64;
    for i in (0..depth).rev() {
        let fi = i as f64;
        path[i + 1].weight += one_fraction * path[i].weight * (fi + 1.0) / (d + 1.0);
        path[i].weight = zero_fraction * path[i].weight * (d - fi) / (d + 1.0);
    }
}

/// Undo `extend_path` for the element at `index`
fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let d = depth as f64;
    let PathElement { zero_fraction, one_fraction, .. } = path[index];
    let mut next_one_portion = path[depth].weight;

    for i in (0..depth).rev() {
        let fi = i as f64;
        if one_fraction != 0.0 {
            let tmp = path[i].weight;
            path[i].weight = next_one_portion * (d + 1.0) / ((fi + 1.0) * one_fraction);
            next_one_portion = tmp - path[i].weight * zero_fraction * (d - fi) / (d + 1.0);
        } else {
            path[i].weight = path[i].weight * (d + 1.0) / (zero_fraction * (d - fi));
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with the element at `index` removed
fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let d = depth as f64;
    let PathElement { zero_fraction, one_fraction, .. } = path[index];
    let mut next_one_portion = path[depth].weight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        let fi = i as f64;
        if one_fraction != 0.0 {
            let tmp = next_one_portion * (d + 1.0) / ((fi + 1.0) * one_fraction);
            total += tmp;
            next_one_portion = path[i].weight - tmp * zero_fraction * ((d - fi) / (d + 1.0));
        } else if zero_fraction != 0.0 {
            total += (path[i].weight / zero_fraction) / ((d - fi) / (d + 1.0));
        }
    }
    total
}

struct ShapWalk<'a> {
    tree: &'a Tree,
    rule: SplitRule,
    x: &'a [f64],
    phi: &'a mut [f64],
}

impl ShapWalk<'_> {
    fn recurse(
        &mut self,
        index: usize,
        mut path: Vec<PathElement>,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
    ) {
        extend_path(&mut path, zero_fraction, one_fraction, feature);

        let tree = self.tree;
        let node = tree.node(index);
        match node.kind {
            NodeKind::Leaf { value } => {
                for i in 1..path.len() {
                    let weight = unwound_path_sum(&path, i);
                    let element = path[i];
                    if let Some(f) = element.feature {
                        self.phi[f] += weight * (element.one_fraction - element.zero_fraction) * value;
                    }
                }
            }
            NodeKind::Split { feature: split, left, right, .. } => {
                let hot = tree.next_node(index, self.x, self.rule);
                let cold = if hot == left { right } else { left };
                let hot_zero_fraction = cover(tree.node(hot)) / cover(node);
                let cold_zero_fraction = cover(tree.node(cold)) / cover(node);

                // a feature already on the path is unwound and re-split here
                let mut incoming_zero_fraction = 1.0;
                let mut incoming_one_fraction = 1.0;
                if let Some(k) = path.iter().position(|e| e.feature == Some(split)) {
                    incoming_zero_fraction = path[k].zero_fraction;
                    incoming_one_fraction = path[k].one_fraction;
                    unwind_path(&mut path, k);
                }

                self.recurse(
                    hot,
                    path.clone(),
                    hot_zero_fraction * incoming_zero_fraction,
                    incoming_one_fraction,
                    Some(split),
                );
                self.recurse(cold, path, cold_zero_fraction * incoming_zero_fraction, 0.0, Some(split));
            }
        }
    }
}
