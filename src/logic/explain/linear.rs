//! Generic attribution for linear models
//!
//! With independent features the Shapley value of a linear log-odds model is
//! `coef_i * (x_i - mean_i)`, where `mean_i` is the training-set mean of the
//! encoded feature.

use crate::logic::model::Classifier;

use super::types::AttributionOutput;
use super::{Attribute, ExplainError};

#[derive(Debug, Clone)]
pub struct LinearExplainer {
    coef: Vec<f64>,
    background_mean: Vec<f64>,
    expected_value: f64,
}

impl LinearExplainer {
    pub fn new(classifier: &Classifier) -> Result<Self, ExplainError> {
        let model = match classifier {
            Classifier::Generic(model) => model,
            Classifier::TreeEnsemble(ensemble) => {
                return Err(ExplainError::UnsupportedModel(ensemble.type_name.clone()))
            }
        };
        let background_mean = model.background_mean.clone().ok_or(ExplainError::MissingBackground)?;
        if background_mean.len() != model.coef.len() {
            return Err(ExplainError::FeatureCountMismatch {
                expected: model.coef.len(),
                actual: background_mean.len(),
            });
        }

        let expected_value = model.intercept
            + model.coef.iter().zip(&background_mean).map(|(c, m)| c * m).sum::<f64>();

        Ok(Self {
            coef: model.coef.clone(),
            background_mean,
            expected_value,
        })
    }

    /// Log-odds of the background (mean) customer
    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }
}

impl Attribute for LinearExplainer {
    fn attribute(&self, x: &[f64]) -> Result<AttributionOutput, ExplainError> {
        if x.len() != self.coef.len() {
            return Err(ExplainError::FeatureCountMismatch {
                expected: self.coef.len(),
                actual: x.len(),
            });
        }

        let phi: Vec<f64> = self
            .coef
            .iter()
            .zip(&self.background_mean)
            .zip(x)
            .map(|((c, m), v)| c * (v - m))
            .collect();

        if let Some(feature) = phi.iter().position(|v| !v.is_finite()) {
            return Err(ExplainError::NonFinite(feature));
        }
        Ok(AttributionOutput::Single(phi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::LinearModel;

    fn classifier(background_mean: Option<Vec<f64>>) -> Classifier {
        Classifier::Generic(LinearModel {
            type_name: "sklearn.linear_model.LogisticRegression".into(),
            coef: vec![2.0, -1.0],
            intercept: 0.5,
            background_mean,
            feature_importances: None,
        })
    }

    #[test]
    fn test_linear_shap_values() {
        let explainer = LinearExplainer::new(&classifier(Some(vec![0.5, 1.0]))).unwrap();

        assert_eq!(explainer.expected_value(), 0.5);
        assert_eq!(
            explainer.attribute(&[1.0, 3.0]).unwrap(),
            AttributionOutput::Single(vec![1.0, -2.0])
        );
    }

    #[test]
    fn test_requires_background() {
        assert!(matches!(
            LinearExplainer::new(&classifier(None)),
            Err(ExplainError::MissingBackground)
        ));
        assert!(LinearExplainer::new(&classifier(Some(vec![0.0]))).is_err());
    }
}
