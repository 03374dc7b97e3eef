use crate::error::{AppError, AppResult};
use crate::middleware::Caller;
use crate::models::{CreateLinkRequest, LinkResponse, MappingPatch, ShortLinkMapping};
use crate::services::Resolution;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::Extension;
use std::sync::Arc;
use uuid::Uuid;

use super::AppState;

fn link_response(state: &AppState, mapping: ShortLinkMapping) -> LinkResponse {
    LinkResponse {
        short_url: state.links.short_url(&mapping.short_code),
        mapping,
    }
}

/// Resolve a short code and redirect.
///
/// Targets can change at any time, so the redirect is temporary (307).
pub async fn resolve_link(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Response {
    match state.resolver.resolve(&code).await {
        Resolution::Target(location) | Resolution::Landing(location) => {
            Redirect::temporary(&location).into_response()
        }
        Resolution::BadRequest => {
            AppError::BadRequest(format!("Malformed short code: {:?}", code)).into_response()
        }
    }
}

/// `GET /go/` with no code
pub async fn missing_code() -> AppError {
    AppError::BadRequest("Short code is required".to_string())
}

/// Create a dynamic link (Pro only)
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateLinkRequest>,
) -> AppResult<impl IntoResponse> {
    let mapping = state.gateway.create_mapping(caller.actor()?, payload).await?;

    Ok((StatusCode::CREATED, Json(link_response(&state, mapping))))
}

/// List the caller's links, newest first
pub async fn list_links(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> AppResult<impl IntoResponse> {
    let links: Vec<LinkResponse> = state
        .gateway
        .list_mappings(caller.actor()?)
        .await?
        .into_iter()
        .map(|mapping| link_response(&state, mapping))
        .collect();

    Ok(Json(links))
}

pub async fn update_link(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(patch): Json<MappingPatch>,
) -> AppResult<impl IntoResponse> {
    let mapping = state.gateway.update_mapping(caller.actor()?, id, patch).await?;

    Ok(Json(link_response(&state, mapping)))
}

pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.gateway.delete_mapping(caller.actor()?, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
