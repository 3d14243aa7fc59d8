//! Pipeline artifact format
//!
//! The artifact is a JSON export of a fitted pipeline: either
//! `{"named_steps": {"preprocessor": ..., "classifier": ...}}` or a bare
//! classifier object. Parsing validates everything that can be checked
//! statically so a bad artifact stops the process before it serves.

use serde::Deserialize;
use serde_json::Value;

use super::ArtifactError;
use crate::logic::model::{logit, Classifier, EnsembleKind, LinearModel, Node, NodeKind, SplitRule, Tree, TreeEnsemble};
use crate::logic::pipeline::{Category, ColumnTransformer, Encoder, HandleUnknown, Preprocessor, TrainedPipeline};

/// Highest artifact format version this build understands
pub const FORMAT_VERSION: u32 = 1;

const DEFAULT_PREPROCESSOR_TYPE: &str = "sklearn.compose.ColumnTransformer";
const DEFAULT_GRADIENT_BOOSTING_TYPE: &str = "xgboost.sklearn.XGBClassifier";
const DEFAULT_RANDOM_FOREST_TYPE: &str = "sklearn.ensemble.RandomForestClassifier";
const DEFAULT_LOGISTIC_REGRESSION_TYPE: &str = "sklearn.linear_model.LogisticRegression";

// ============================================================================
// DOCUMENT SCHEMA
// ============================================================================

#[derive(Debug, Deserialize)]
struct PipelineDoc {
    #[serde(default = "default_format_version")]
    format_version: u32,
    named_steps: NamedSteps,
}

fn default_format_version() -> u32 {
    FORMAT_VERSION
}

#[derive(Debug, Deserialize)]
struct NamedSteps {
    #[serde(default)]
    preprocessor: Option<PreprocessorDoc>,
    #[serde(default)]
    classifier: Option<ClassifierDoc>,
}

#[derive(Debug, Deserialize)]
struct PreprocessorDoc {
    #[serde(default)]
    type_name: Option<String>,
    transformers: Vec<TransformerDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TransformerDoc {
    StandardScaler {
        name: String,
        columns: Vec<String>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    OneHot {
        name: String,
        columns: Vec<String>,
        categories: Vec<Vec<Category>>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
    Passthrough {
        name: String,
        columns: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClassifierDoc {
    GradientBoosting(GradientBoostingDoc),
    RandomForest(RandomForestDoc),
    LogisticRegression(LogisticRegressionDoc),
}

#[derive(Debug, Deserialize)]
struct GradientBoostingDoc {
    #[serde(default)]
    type_name: Option<String>,
    #[serde(default = "default_objective")]
    objective: String,
    #[serde(default = "default_base_score")]
    base_score: f64,
    n_features: usize,
    #[serde(default)]
    split_rule: SplitRule,
    #[serde(default)]
    feature_importances: Option<Vec<f64>>,
    trees: Vec<TreeDoc>,
}

fn default_objective() -> String {
    "binary:logistic".to_string()
}

fn default_base_score() -> f64 {
    0.5
}

#[derive(Debug, Deserialize)]
struct RandomForestDoc {
    #[serde(default)]
    type_name: Option<String>,
    n_features: usize,
    #[serde(default = "default_forest_split_rule")]
    split_rule: SplitRule,
    #[serde(default)]
    feature_importances: Option<Vec<f64>>,
    trees: Vec<TreeDoc>,
}

fn default_forest_split_rule() -> SplitRule {
    SplitRule::Le
}

#[derive(Debug, Deserialize)]
struct LogisticRegressionDoc {
    #[serde(default)]
    type_name: Option<String>,
    coef: Vec<f64>,
    intercept: f64,
    #[serde(default)]
    background_mean: Option<Vec<f64>>,
    #[serde(default)]
    feature_importances: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct TreeDoc {
    nodes: Vec<NodeDoc>,
}

/// Split nodes carry `feature/threshold/left/right`, leaves carry `value`
#[derive(Debug, Deserialize)]
struct NodeDoc {
    #[serde(default)]
    feature: Option<usize>,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(default)]
    left: Option<usize>,
    #[serde(default)]
    right: Option<usize>,
    #[serde(default)]
    missing: Option<usize>,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    cover: Option<f64>,
    #[serde(default)]
    gain: Option<f64>,
}

// ============================================================================
// CONVERSION
// ============================================================================

/// Parse and validate a pipeline artifact
pub fn parse_pipeline(bytes: &[u8]) -> Result<TrainedPipeline, ArtifactError> {
    let document: Value = serde_json::from_slice(bytes)?;

    let (preprocessor, classifier) = if document.get("named_steps").is_some() {
        let doc: PipelineDoc = serde_json::from_value(document)?;
        if doc.format_version > FORMAT_VERSION {
            return Err(ArtifactError::Invalid(format!(
                "artifact format version {} is newer than supported version {}",
                doc.format_version, FORMAT_VERSION
            )));
        }
        let classifier = doc
            .named_steps
            .classifier
            .ok_or_else(|| ArtifactError::Invalid("pipeline has no 'classifier' step".to_string()))?;
        (doc.named_steps.preprocessor, classifier)
    } else {
        (None, serde_json::from_value::<ClassifierDoc>(document)?)
    };

    let preprocessor = preprocessor.map(build_preprocessor).transpose()?;
    let classifier = build_classifier(classifier)?;
    Ok(TrainedPipeline::new(preprocessor, classifier))
}

fn build_preprocessor(doc: PreprocessorDoc) -> Result<Preprocessor, ArtifactError> {
    let transformers = doc
        .transformers
        .into_iter()
        .map(|transformer| {
            let (name, columns, encoder) = match transformer {
                TransformerDoc::StandardScaler { name, columns, mean, scale } => {
                    (name, columns, Encoder::StandardScaler { mean, scale })
                }
                TransformerDoc::OneHot { name, columns, categories, handle_unknown } => {
                    (name, columns, Encoder::OneHot { categories, handle_unknown })
                }
                TransformerDoc::Passthrough { name, columns } => (name, columns, Encoder::Passthrough),
            };
            ColumnTransformer::new(name, columns, encoder).map_err(ArtifactError::Invalid)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Preprocessor {
        type_name: doc.type_name.unwrap_or_else(|| DEFAULT_PREPROCESSOR_TYPE.to_string()),
        transformers,
    })
}

fn build_classifier(doc: ClassifierDoc) -> Result<Classifier, ArtifactError> {
    match doc {
        ClassifierDoc::GradientBoosting(doc) => {
            if doc.objective != "binary:logistic" {
                return Err(ArtifactError::Invalid(format!("unsupported objective '{}'", doc.objective)));
            }
            if !(doc.base_score > 0.0 && doc.base_score < 1.0) {
                return Err(ArtifactError::Invalid(format!(
                    "base_score must be a probability in (0, 1), got {}",
                    doc.base_score
                )));
            }
            let trees = build_trees(doc.trees, doc.n_features)?;
            check_importances(doc.feature_importances.as_deref(), doc.n_features);

            Ok(Classifier::TreeEnsemble(TreeEnsemble::new(
                doc.type_name.unwrap_or_else(|| DEFAULT_GRADIENT_BOOSTING_TYPE.to_string()),
                EnsembleKind::GradientBoosting { base_margin: logit(doc.base_score) },
                trees,
                doc.n_features,
                doc.split_rule,
                doc.feature_importances,
            )))
        }
        ClassifierDoc::RandomForest(doc) => {
            let trees = build_trees(doc.trees, doc.n_features)?;
            if trees.is_empty() {
                return Err(ArtifactError::Invalid("random forest has no trees".to_string()));
            }
            let out_of_range = trees.iter().flat_map(|t| t.nodes()).any(|node| {
                matches!(node.kind, NodeKind::Leaf { value } if !(0.0..=1.0).contains(&value))
            });
            if out_of_range {
                return Err(ArtifactError::Invalid(
                    "random forest leaf values must be probabilities in [0, 1]".to_string(),
                ));
            }
            check_importances(doc.feature_importances.as_deref(), doc.n_features);

            Ok(Classifier::TreeEnsemble(TreeEnsemble::new(
                doc.type_name.unwrap_or_else(|| DEFAULT_RANDOM_FOREST_TYPE.to_string()),
                EnsembleKind::RandomForest,
                trees,
                doc.n_features,
                doc.split_rule,
                doc.feature_importances,
            )))
        }
        ClassifierDoc::LogisticRegression(doc) => {
            if doc.coef.is_empty() {
                return Err(ArtifactError::Invalid("logistic regression has no coefficients".to_string()));
            }
            check_importances(doc.feature_importances.as_deref(), doc.coef.len());

            Ok(Classifier::Generic(LinearModel {
                type_name: doc.type_name.unwrap_or_else(|| DEFAULT_LOGISTIC_REGRESSION_TYPE.to_string()),
                coef: doc.coef,
                intercept: doc.intercept,
                background_mean: doc.background_mean,
                feature_importances: doc.feature_importances,
            }))
        }
    }
}

/// Importances of the wrong length still load; explaining with them fails
fn check_importances(importances: Option<&[f64]>, n_features: usize) {
    if let Some(importances) = importances {
        if importances.len() != n_features {
            tracing::warn!(
                "Classifier declares {} feature importances for {} features",
                importances.len(),
                n_features
            );
        }
    }
}

fn build_trees(docs: Vec<TreeDoc>, n_features: usize) -> Result<Vec<Tree>, ArtifactError> {
    docs
        .into_iter()
        .enumerate()
        .map(|(tree_index, doc)| {
            let nodes = doc
                .nodes
                .into_iter()
                .enumerate()
                .map(|(node_index, node)| build_node(node).map_err(|e| format!("node {}: {}", node_index, e)))
                .collect::<Result<Vec<_>, _>>()
                .and_then(|nodes| Tree::new(nodes, n_features));

            nodes.map_err(|e| ArtifactError::Invalid(format!("tree {}: {}", tree_index, e)))
        })
        .collect()
}

fn build_node(doc: NodeDoc) -> Result<Node, String> {
    let kind = match (doc.value, doc.feature, doc.threshold, doc.left, doc.right) {
        (Some(value), None, None, None, None) => NodeKind::Leaf { value },
        (None, Some(feature), Some(threshold), Some(left), Some(right)) => NodeKind::Split {
            feature,
            threshold,
            left,
            right,
            missing: doc.missing.unwrap_or(left),
        },
        _ => {
            return Err(
                "expected either a leaf {value} or a split {feature, threshold, left, right}".to_string(),
            )
        }
    };

    Ok(Node { kind, cover: doc.cover, gain: doc.gain })
}
