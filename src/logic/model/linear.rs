//! Linear classifier (logistic regression)

use super::{sigmoid, InferenceError};

#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub type_name: String,
    pub coef: Vec<f64>,
    pub intercept: f64,
    /// Mean of each encoded feature over the training data, if exported
    pub background_mean: Option<Vec<f64>>,
    pub feature_importances: Option<Vec<f64>>,
}

impl LinearModel {
    pub fn n_features(&self) -> usize {
        self.coef.len()
    }

    /// Log-odds of churn
    pub fn decision_function(&self, x: &[f64]) -> Result<f64, InferenceError> {
        if x.len() != self.coef.len() {
            return Err(InferenceError::FeatureCountMismatch {
                expected: self.coef.len(),
                actual: x.len(),
            });
        }

        let margin = self.intercept + self.coef.iter().zip(x).map(|(c, v)| c * v).sum::<f64>();
        if !margin.is_finite() {
            return Err(InferenceError::NonFinite(margin));
        }
        Ok(margin)
    }

    pub fn predict_proba(&self, x: &[f64]) -> Result<f64, InferenceError> {
        self.decision_function(x).map(sigmoid)
    }
}
