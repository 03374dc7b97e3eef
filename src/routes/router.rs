use crate::config::{CorsConfig, RateLimitConfig};
use crate::error::{AppError, AppResult};
use crate::middleware::{
    caller_middleware, request_context_middleware, request_id_middleware, AuthAwareKeyExtractor,
};
use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::admin_handlers;
use super::auth_handlers;
use super::health;
use super::link_handlers;
use super::AppState;

/// Request bodies are small JSON documents; style options included
const MAX_BODY_BYTES: usize = 64 * 1024;

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    if cors.allows_any() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<http::HeaderValue> = cors
            .allowed_origins
            .iter()
            .filter_map(|s| s.parse::<http::HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Create application router
pub fn create_router(
    state: Arc<AppState>,
    cors: &CorsConfig,
    rate_limit: &RateLimitConfig,
) -> AppResult<Router> {
    // Auth-aware limits for the API
    let governor_api = GovernorConfigBuilder::default()
        .per_millisecond(rate_limit.period_ms())
        .burst_size(rate_limit.burst_size)
        .key_extractor(AuthAwareKeyExtractor)
        .finish()
        .ok_or_else(|| AppError::Configuration("Invalid API rate limit".to_string()))?;

    let api_routes = Router::new()
        .route("/api/auth/register", post(auth_handlers::register))
        .route("/api/auth/login", post(auth_handlers::login))
        .route(
            "/api/links",
            get(link_handlers::list_links).post(link_handlers::create_link),
        )
        .route(
            "/api/links/{id}",
            patch(link_handlers::update_link).delete(link_handlers::delete_link),
        )
        .route("/api/admin/stats", get(admin_handlers::get_stats))
        .route("/api/admin/users", get(admin_handlers::list_users))
        .route(
            "/api/admin/users/{id}",
            patch(admin_handlers::update_user).delete(admin_handlers::delete_user),
        )
        .route(
            "/api/admin/links/{id}/reset-clicks",
            post(admin_handlers::reset_clicks),
        )
        .layer(GovernorLayer::new(governor_api));

    // Redirects are never throttled per caller
    let redirect_routes = Router::new()
        .route("/go/{code}", get(link_handlers::resolve_link))
        .route("/go/", get(link_handlers::missing_code))
        .route("/go", get(link_handlers::missing_code));

    let health_routes = Router::new().route("/_health", get(health::health_check));

    // The last layer added runs first: request id, context, then the caller
    let router = api_routes
        .merge(redirect_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(cors_layer(cors)),
        )
        .layer(middleware::from_fn_with_state(state.clone(), caller_middleware))
        .layer(middleware::from_fn(request_context_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(router)
}
