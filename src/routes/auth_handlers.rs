use crate::error::AppResult;
use crate::models::{LoginRequest, RegisterRequest};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use std::sync::Arc;

use super::AppState;

/// Register a new (non-Pro) account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let profile = state.accounts.register(payload).await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Login to get JWT token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let response = state.accounts.login(payload).await?;

    Ok(Json(response))
}
