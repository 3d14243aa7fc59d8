//! Model metadata handler

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub model_type: String,
    pub features: Features,
    pub explainability: &'static str,
    pub model_source: String,
    pub model_sha256: String,
    pub loaded_at: DateTime<Utc>,
}

/// Encoded feature names, or `"unknown"` without a preprocessor
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Features {
    Names(Vec<String>),
    Unknown(&'static str),
}

pub async fn get(State(state): State<AppState>) -> Json<InfoResponse> {
    let model = &state.model;
    let artifact = model.artifact();

    Json(InfoResponse {
        model_type: model.model_type().to_string(),
        features: model
            .feature_names()
            .map(Features::Names)
            .unwrap_or(Features::Unknown("unknown")),
        explainability: model.strategy().mode(),
        model_source: artifact.source.clone(),
        model_sha256: artifact.sha256.clone(),
        loaded_at: artifact.loaded_at,
    })
}
