//! Model Module - classifier inference
//!
//! A loaded classifier is either a tree ensemble or a generic (linear) model.
//! The variant is fixed when the artifact is loaded; nothing downstream
//! probes the model's capabilities at request time.

pub mod linear;
pub mod trees;

pub use linear::LinearModel;
pub use trees::{EnsembleKind, Node, NodeKind, SplitRule, Tree, TreeEnsemble};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("X has {actual} features, but the classifier is expecting {expected} features as input")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("classifier produced a non-finite output ({0})")]
    NonFinite(f64),

    #[error(transparent)]
    Transform(#[from] crate::logic::pipeline::TransformError),
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

pub fn logit(probability: f64) -> f64 {
    (probability / (1.0 - probability)).ln()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classifier {
    TreeEnsemble(TreeEnsemble),
    Generic(LinearModel),
}

impl Classifier {
    /// Fully qualified type name reported by `/info`
    pub fn type_name(&self) -> &str {
        match self {
            Classifier::TreeEnsemble(ensemble) => &ensemble.type_name,
            Classifier::Generic(model) => &model.type_name,
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            Classifier::TreeEnsemble(ensemble) => ensemble.n_features,
            Classifier::Generic(model) => model.n_features(),
        }
    }

    /// Global per-feature importances, when the model has them
    pub fn feature_importances(&self) -> Option<&[f64]> {
        match self {
            Classifier::TreeEnsemble(ensemble) => Some(&ensemble.feature_importances),
            Classifier::Generic(model) => model.feature_importances.as_deref(),
        }
    }

    /// Positive-class (churn) probability for an encoded feature vector
    pub fn predict_proba(&self, x: &[f64]) -> Result<f64, InferenceError> {
        match self {
            Classifier::TreeEnsemble(ensemble) => ensemble.predict_proba(x),
            Classifier::Generic(model) => model.predict_proba(x),
        }
    }
}
