//! Prediction request parameters and response bodies

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::logic::explain::ExplanationItem;

/// Default number of contributors returned by `/predict_with_explain`
pub const DEFAULT_TOP_K: usize = 5;

/// Probability at or above which a customer is labelled as churning
pub const CHURN_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChurnLabel {
    Yes,
    No,
}

impl ChurnLabel {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= CHURN_THRESHOLD {
            ChurnLabel::Yes
        } else {
            ChurnLabel::No
        }
    }
}

/// Output of the prediction service for one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Unrounded positive-class probability
    pub probability: f64,
    pub label: ChurnLabel,
}

impl Prediction {
    pub fn from_probability(probability: f64) -> Self {
        Self {
            probability,
            label: ChurnLabel::from_probability(probability),
        }
    }
}

/// Round a probability to 4 decimal digits for the wire
pub fn round_probability(probability: f64) -> f64 {
    (probability * 10_000.0).round() / 10_000.0
}

#[derive(Debug, Deserialize)]
pub struct ExplainParams {
    #[serde(default = "default_top_k", deserialize_with = "deserialize_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Any non-negative integer; values past `usize::MAX` saturate
fn deserialize_top_k<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(de::Error::custom(format!(
            "top_k must be a non-negative integer, got '{}'",
            raw
        )));
    }
    Ok(raw.parse().unwrap_or(usize::MAX))
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub churn_probability: f64,
    pub churn_label: ChurnLabel,
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            churn_probability: round_probability(prediction.probability),
            churn_label: prediction.label,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictWithExplainResponse {
    #[serde(flatten)]
    pub prediction: PredictResponse,
    /// Serialized as `null` when no explanation strategy applies
    pub explanation: Option<Vec<ExplanationItem>>,
}
