//! Explain Module - per-prediction feature attributions
//!
//! The explainer is selected once from the classifier's capabilities
//! (`strategy`), then consulted read-only for every request (`engine`).

pub mod engine;
pub mod linear;
pub mod strategy;
pub mod tree_shap;
pub mod types;

#[cfg(test)]
mod tests;

pub use engine::explain;
pub use strategy::Explainer;
pub use types::{ExplanationItem, ExplanationStrategy};

use crate::logic::model::InferenceError;
use crate::logic::pipeline::TransformError;
use types::AttributionOutput;

#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Model(#[from] InferenceError),

    #[error("explainer expects {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("{0} is not supported by this explainer")]
    UnsupportedModel(String),

    #[error("tree {tree} node {node} has no positive cover; node sample weights are required")]
    MissingCover { tree: usize, node: usize },

    #[error("linear explainer needs the training feature means (background_mean)")]
    MissingBackground,

    #[error("Additivity check failed: attributions sum to {sum} but model output minus expected value is {expected}")]
    Additivity { sum: f64, expected: f64 },

    #[error("attribution for feature {0} is not finite")]
    NonFinite(usize),

    #[error("{names} feature names for {values} values")]
    NameCountMismatch { names: usize, values: usize },

    #[error("explainer returned no output")]
    EmptyOutput,

    #[error("no attribution method configured")]
    NoMethods,
}

/// An explainer producing per-record attributions from an encoded vector
pub trait Attribute {
    fn attribute(&self, x: &[f64]) -> Result<AttributionOutput, ExplainError>;
}
