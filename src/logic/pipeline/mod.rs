//! Pipeline Module - preprocessor + classifier
//!
//! The trained pipeline is loaded once and only read afterwards.

pub mod preprocess;

pub use preprocess::{
    Category, ColumnTransformer, Encoder, FeatureTransform, HandleUnknown, Preprocessor, TransformError,
};

use crate::logic::model::{Classifier, InferenceError};
use crate::models::{CustomerRecord, Prediction};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainedPipeline {
    preprocessor: Option<Preprocessor>,
    classifier: Classifier,
}

impl TrainedPipeline {
    pub fn new(preprocessor: Option<Preprocessor>, classifier: Classifier) -> Self {
        if let Some(pre) = &preprocessor {
            if pre.n_features_out() != classifier.n_features() {
                tracing::warn!(
                    "Preprocessor emits {} features but the classifier expects {}; predictions will fail",
                    pre.n_features_out(),
                    classifier.n_features()
                );
            }
        }
        Self { preprocessor, classifier }
    }

    pub fn preprocessor(&self) -> Option<&Preprocessor> {
        self.preprocessor.as_ref()
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Encoded feature vector for a record: the preprocessor output, or the
    /// raw encoding when the artifact is a bare classifier.
    pub fn features(&self, record: &CustomerRecord) -> Result<Vec<f64>, TransformError> {
        match &self.preprocessor {
            Some(pre) => pre.transform(record),
            None => Ok(record.raw_features()),
        }
    }

    /// Run the full pipeline on one record
    pub fn predict(&self, record: &CustomerRecord) -> Result<Prediction, InferenceError> {
        let x = self.features(record)?;
        let probability = self.classifier.predict_proba(&x)?;
        Ok(Prediction::from_probability(probability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::LinearModel;
    use crate::models::ChurnLabel;
    use crate::test_support::{demo_pipeline, sample_record};

    #[test]
    fn test_demo_pipeline_predicts_probability() {
        let prediction = demo_pipeline().predict(&sample_record()).unwrap();

        assert!((0.0..=1.0).contains(&prediction.probability));
        assert_eq!(prediction.label, ChurnLabel::from_probability(prediction.probability));
    }

    #[test]
    fn test_bare_classifier_uses_raw_encoding() {
        let mut coef = vec![0.0; CustomerRecord::FIELDS.len()];
        coef[4] = -0.1; // tenure
        let pipeline = TrainedPipeline::new(
            None,
            Classifier::Generic(LinearModel {
                type_name: "sklearn.linear_model.LogisticRegression".into(),
                coef,
                intercept: 0.2,
                background_mean: None,
                feature_importances: None,
            }),
        );

        // 0.2 - 0.1 * 2 == 0
        let prediction = pipeline.predict(&sample_record()).unwrap();
        assert!((prediction.probability - 0.5).abs() < 1e-12);
        assert_eq!(prediction.label, ChurnLabel::Yes);
    }

    #[test]
    fn test_width_mismatch_fails_prediction() {
        let pipeline = TrainedPipeline::new(
            None,
            Classifier::Generic(LinearModel {
                type_name: "sklearn.linear_model.LogisticRegression".into(),
                coef: vec![1.0; 3],
                intercept: 0.0,
                background_mean: None,
                feature_importances: None,
            }),
        );

        let err = pipeline.predict(&sample_record()).unwrap_err();
        assert!(err.to_string().contains("expecting 3 features"));
    }
}
