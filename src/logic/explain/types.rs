use serde::{Deserialize, Serialize};

/// One entry of the `explanation` list in `/predict_with_explain`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExplanationItem {
    /// Signed, record-specific contribution (positive pushes toward churn)
    Attribution { feature: String, shap_value: f64 },
    /// Global, record-independent importance
    Importance { feature: String, importance: f64 },
    Failure { error: String, detail: String },
}

impl ExplanationItem {
    pub fn failure(error: &str, detail: impl ToString) -> Self {
        ExplanationItem::Failure {
            error: error.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// Explanation strategy chosen once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplanationStrategy {
    TreeAttribution,
    GenericAttribution,
    RawImportance,
    None,
}

impl ExplanationStrategy {
    /// Mode string reported by `/info`
    pub fn mode(self) -> &'static str {
        match self {
            ExplanationStrategy::TreeAttribution | ExplanationStrategy::GenericAttribution => "shap",
            ExplanationStrategy::RawImportance => "feature_importances",
            ExplanationStrategy::None => "none",
        }
    }
}

/// Raw explainer output: one vector, or one vector per class
#[derive(Debug, Clone, PartialEq)]
pub enum AttributionOutput {
    Single(Vec<f64>),
    PerClass(Vec<Vec<f64>>),
}

impl AttributionOutput {
    /// Contributions toward the positive (churn) class
    pub fn positive_class(self) -> Option<Vec<f64>> {
        match self {
            AttributionOutput::Single(values) => Some(values),
            AttributionOutput::PerClass(mut classes) if classes.len() > 1 => Some(classes.swap_remove(1)),
            AttributionOutput::PerClass(classes) => classes.into_iter().next(),
        }
    }
}
