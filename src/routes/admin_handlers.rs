use crate::error::AppResult;
use crate::middleware::Caller;
use crate::models::{LinkResponse, UpdateAccountRequest};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::Extension;
use std::sync::Arc;
use uuid::Uuid;

use super::AppState;

/// Dashboard totals and the last week of link creation
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> AppResult<impl IntoResponse> {
    let stats = state.accounts.stats(caller.actor()?).await?;

    Ok(Json(stats))
}

/// All accounts with their link counts, newest first
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> AppResult<impl IntoResponse> {
    let users = state.accounts.list_users(caller.actor()?).await?;

    Ok(Json(users))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAccountRequest>,
) -> AppResult<impl IntoResponse> {
    let profile = state.accounts.update_user(caller.actor()?, id, payload).await?;

    Ok(Json(profile))
}

/// Delete an account together with its links
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.accounts.delete_user(caller.actor()?, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn reset_clicks(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let mapping = state.gateway.reset_clicks(caller.actor()?, id).await?;

    Ok(Json(LinkResponse {
        short_url: state.links.short_url(&mapping.short_code),
        mapping,
    }))
}
