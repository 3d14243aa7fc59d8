//! Explainability selector - runs once at startup

use crate::logic::model::Classifier;

use super::linear::LinearExplainer;
use super::tree_shap::TreeExplainer;
use super::types::ExplanationStrategy;

/// The explainer selected for the loaded classifier
#[derive(Debug, Clone)]
pub enum Explainer {
    Tree(TreeExplainer),
    Generic(LinearExplainer),
    /// Global importance vector, the same for every record
    RawImportance(Vec<f64>),
    None,
}

impl Explainer {
    /// Pick the explainer for a classifier. Never fails: an explainer that
    /// cannot be built degrades to the next option.
    pub fn select(classifier: &Classifier) -> Self {
        if looks_like_tree_model(classifier) {
            match TreeExplainer::new(classifier) {
                Ok(explainer) => {
                    tracing::debug!("Tree explainer base value: {:.6}", explainer.expected_value());
                    return Explainer::Tree(explainer);
                }
                Err(e) => tracing::warn!(
                    "Tree explainer unavailable for {}: {}",
                    classifier.type_name(),
                    e
                ),
            }
        }

        if let Some(importances) = classifier.feature_importances() {
            return Explainer::RawImportance(importances.to_vec());
        }

        match LinearExplainer::new(classifier) {
            Ok(explainer) => {
                tracing::debug!("Linear explainer base value: {:.6}", explainer.expected_value());
                Explainer::Generic(explainer)
            }
            Err(e) => {
                tracing::debug!("Generic explainer unavailable: {}", e);
                Explainer::None
            }
        }
    }

    pub fn strategy(&self) -> ExplanationStrategy {
        match self {
            Explainer::Tree(_) => ExplanationStrategy::TreeAttribution,
            Explainer::Generic(_) => ExplanationStrategy::GenericAttribution,
            Explainer::RawImportance(_) => ExplanationStrategy::RawImportance,
            Explainer::None => ExplanationStrategy::None,
        }
    }
}

/// XGBoost models by name, or anything exposing tree-style importances
fn looks_like_tree_model(classifier: &Classifier) -> bool {
    classifier.type_name().to_lowercase().contains("xgb") || classifier.feature_importances().is_some()
}
