//! Extractors that render rejections as `{"detail": ...}` bodies

use axum::extract::{FromRequest, FromRequestParts};

use crate::AppError;

/// `Json<T>` with 422/400/415 rejections
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);

/// `Query<T>` with 422 rejections
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ValidQuery<T>(pub T);
