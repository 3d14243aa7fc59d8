//! Model context - the loaded pipeline plus its startup-selected explainer

use super::artifact::{ArtifactInfo, LoadedArtifact};
use super::explain::{self, Explainer, ExplanationItem, ExplanationStrategy};
use super::model::InferenceError;
use super::pipeline::{FeatureTransform, TrainedPipeline};
use crate::models::{CustomerRecord, Prediction};

/// Immutable after construction; shared by every request
#[derive(Debug)]
pub struct ModelContext {
    pipeline: TrainedPipeline,
    explainer: Explainer,
    artifact: ArtifactInfo,
}

impl ModelContext {
    pub fn new(loaded: LoadedArtifact) -> Self {
        let LoadedArtifact { pipeline, info } = loaded;
        let explainer = Explainer::select(pipeline.classifier());

        tracing::info!(
            "Model ready: {} ({} features), explainability: {}",
            pipeline.classifier().type_name(),
            pipeline.classifier().n_features(),
            explainer.strategy().mode()
        );

        Self { pipeline, explainer, artifact: info }
    }

    pub fn predict(&self, record: &CustomerRecord) -> Result<Prediction, InferenceError> {
        self.pipeline.predict(record)
    }

    /// Top-`top_k` explanation, `None` when no explanation applies
    pub fn explain(&self, record: &CustomerRecord, top_k: usize) -> Option<Vec<ExplanationItem>> {
        explain::explain(&self.explainer, self.pipeline.preprocessor(), record, top_k)
    }

    pub fn strategy(&self) -> ExplanationStrategy {
        self.explainer.strategy()
    }

    pub fn model_type(&self) -> &str {
        self.pipeline.classifier().type_name()
    }

    /// Encoded feature names, when the pipeline has a preprocessor
    pub fn feature_names(&self) -> Option<Vec<String>> {
        self.pipeline.preprocessor().and_then(|pre| pre.feature_names_out())
    }

    pub fn artifact(&self) -> &ArtifactInfo {
        &self.artifact
    }
}
