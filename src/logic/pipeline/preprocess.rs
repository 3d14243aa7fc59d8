//! Preprocessor - column transformer over customer records
//!
//! Mirrors a fitted scikit-learn `ColumnTransformer`: each transformer reads
//! a fixed set of record columns and appends its encoded block to the feature
//! vector. Output names follow the `<transformer>__<column>[_<category>]`
//! convention so explanations read like the training notebook.

use serde::{Deserialize, Serialize};

use crate::models::{CustomerRecord, FieldValue};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("Found unknown categories ['{value}'] in column '{column}' during transform")]
    UnknownCategory { column: String, value: String },

    #[error("column '{column}' is not numeric")]
    NotNumeric { column: String },

    #[error("column '{0}' is not part of the customer record")]
    UnknownColumn(String),
}

/// Maps a record to an encoded feature vector
pub trait FeatureTransform {
    fn transform(&self, record: &CustomerRecord) -> Result<Vec<f64>, TransformError>;

    /// Names of the encoded features, when the transform can provide them
    fn feature_names_out(&self) -> Option<Vec<String>>;
}

/// A category as exported by the encoder: string labels or integer codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Integer(i64),
    Text(String),
}

impl Category {
    pub fn matches(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (Category::Text(label), FieldValue::Category(actual)) => label == actual,
            (Category::Integer(code), FieldValue::Number(actual)) => *code as f64 == *actual,
            _ => false,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Integer(code) => write!(f, "{}", code),
            Category::Text(label) => write!(f, "{}", label),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HandleUnknown {
    #[default]
    Error,
    Ignore,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Encoder {
    StandardScaler { mean: Vec<f64>, scale: Vec<f64> },
    OneHot { categories: Vec<Vec<Category>>, handle_unknown: HandleUnknown },
    Passthrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTransformer {
    pub name: String,
    pub columns: Vec<String>,
    pub encoder: Encoder,
}

impl ColumnTransformer {
    /// Check column names and parameter shapes against the record schema
    pub fn new(name: String, columns: Vec<String>, mut encoder: Encoder) -> Result<Self, String> {
        for column in &columns {
            if !CustomerRecord::is_field(column) {
                return Err(format!("transformer '{}' reads unknown column '{}'", name, column));
            }
        }

        match &mut encoder {
            Encoder::StandardScaler { mean, scale } => {
                if mean.len() != columns.len() || scale.len() != columns.len() {
                    return Err(format!(
                        "transformer '{}' has {} columns but {} means and {} scales",
                        name,
                        columns.len(),
                        mean.len(),
                        scale.len()
                    ));
                }
                // a constant column is left unscaled
                scale.iter_mut().filter(|s| **s == 0.0).for_each(|s| *s = 1.0);
            }
            Encoder::OneHot { categories, .. } => {
                if categories.len() != columns.len() {
                    return Err(format!(
                        "transformer '{}' has {} columns but {} category lists",
                        name,
                        columns.len(),
                        categories.len()
                    ));
                }
            }
            Encoder::Passthrough => {}
        }

        if !matches!(encoder, Encoder::OneHot { .. }) {
            if let Some(column) = columns.iter().find(|c| !CustomerRecord::is_numeric_field(c)) {
                return Err(format!("transformer '{}' needs numeric column '{}'", name, column));
            }
        }

        Ok(Self { name, columns, encoder })
    }

    pub fn n_features_out(&self) -> usize {
        match &self.encoder {
            Encoder::OneHot { categories, .. } => categories.iter().map(Vec::len).sum(),
            _ => self.columns.len(),
        }
    }

    fn value(&self, record: &CustomerRecord, column: &str) -> Result<FieldValue, TransformError> {
        record
            .field(column)
            .ok_or_else(|| TransformError::UnknownColumn(column.to_string()))
    }

    fn number(&self, record: &CustomerRecord, column: &str) -> Result<f64, TransformError> {
        match self.value(record, column)? {
            FieldValue::Number(v) => Ok(v),
            FieldValue::Category(_) => Err(TransformError::NotNumeric { column: column.to_string() }),
        }
    }

    fn encode_into(&self, record: &CustomerRecord, out: &mut Vec<f64>) -> Result<(), TransformError> {
        match &self.encoder {
            Encoder::StandardScaler { mean, scale } => {
                for (i, column) in self.columns.iter().enumerate() {
                    out.push((self.number(record, column)? - mean[i]) / scale[i]);
                }
            }
            Encoder::OneHot { categories, handle_unknown } => {
                for (column, known) in self.columns.iter().zip(categories) {
                    let value = self.value(record, column)?;
                    let hit = known.iter().position(|c| c.matches(&value));
                    if hit.is_none() && *handle_unknown == HandleUnknown::Error {
                        return Err(TransformError::UnknownCategory {
                            column: column.clone(),
                            value: value.to_string(),
                        });
                    }
                    out.extend((0..known.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
                }
            }
            Encoder::Passthrough => {
                for column in &self.columns {
                    out.push(self.number(record, column)?);
                }
            }
        }
        Ok(())
    }

    fn names_into(&self, out: &mut Vec<String>) {
        match &self.encoder {
            Encoder::OneHot { categories, .. } => {
                for (column, known) in self.columns.iter().zip(categories) {
                    out.extend(known.iter().map(|c| format!("{}__{}_{}", self.name, column, c)));
                }
            }
            _ => out.extend(self.columns.iter().map(|c| format!("{}__{}", self.name, c))),
        }
    }
}

/// The fitted preprocessing stage of a pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessor {
    pub type_name: String,
    pub transformers: Vec<ColumnTransformer>,
}

impl Preprocessor {
    pub fn n_features_out(&self) -> usize {
        self.transformers.iter().map(ColumnTransformer::n_features_out).sum()
    }
}

impl FeatureTransform for Preprocessor {
    fn transform(&self, record: &CustomerRecord) -> Result<Vec<f64>, TransformError> {
        let mut out = Vec::with_capacity(self.n_features_out());
        for transformer in &self.transformers {
            transformer.encode_into(record, &mut out)?;
        }
        Ok(out)
    }

    fn feature_names_out(&self) -> Option<Vec<String>> {
        let mut names = Vec::with_capacity(self.n_features_out());
        for transformer in &self.transformers {
            transformer.names_into(&mut names);
        }
        Some(names)
    }
}
