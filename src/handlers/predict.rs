//! Prediction handlers

use axum::{extract::State, Json};

use super::extract::{ValidJson, ValidQuery};
use crate::models::{CustomerRecord, ExplainParams, PredictResponse, PredictWithExplainResponse};
use crate::{AppError, AppResult, AppState};

/// Churn probability and label for one customer
pub async fn predict(
    State(state): State<AppState>,
    ValidJson(record): ValidJson<CustomerRecord>,
) -> AppResult<Json<PredictResponse>> {
    let model = state.model.clone();
    let prediction = tokio::task::spawn_blocking(move || model.predict(&record))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(Json(prediction.into()))
}

/// Prediction plus the top contributing features
pub async fn predict_with_explain(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<ExplainParams>,
    ValidJson(record): ValidJson<CustomerRecord>,
) -> AppResult<Json<PredictWithExplainResponse>> {
    let model = state.model.clone();
    let (prediction, explanation) = tokio::task::spawn_blocking(move || {
        let prediction = model.predict(&record)?;
        Ok::<_, AppError>((prediction, model.explain(&record, params.top_k)))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(Json(PredictWithExplainResponse {
        prediction: prediction.into(),
        explanation,
    }))
}
