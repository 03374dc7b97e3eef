use crate::auth::{evaluate_claims, Actor};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::key_extractor::KeyExtractor;
use tracing::debug;
use uuid::Uuid;

/// Request ID wrapper for use in request extensions
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// Request context containing request metadata
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub client_ip: String,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(request_id: String, client_ip: String, user_agent: Option<String>) -> Self {
        Self {
            request_id,
            client_ip,
            user_agent,
        }
    }
}

/// Who sent the request, as established from the bearer token
#[derive(Debug, Clone, PartialEq)]
pub enum Caller {
    Anonymous,
    Authenticated(Actor),
    /// A token was presented but did not verify
    Rejected(String),
}

impl Caller {
    /// The actor, if any; a rejected token is an error
    pub fn actor(&self) -> AppResult<Option<&Actor>> {
        match self {
            Caller::Anonymous => Ok(None),
            Caller::Authenticated(actor) => Ok(Some(actor)),
            Caller::Rejected(reason) => Err(AppError::Unauthenticated(reason.clone())),
        }
    }
}

/// Extract client IP address from proxy headers
pub fn forwarded_client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return Some(first_ip.to_string());
                }
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(|ip| ip.to_string())
}

/// Client IP: proxy headers first, then the peer address of the connection
pub fn extract_client_ip<B>(req: &Request<B>) -> String {
    forwarded_client_ip(req.headers())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Extract user agent from headers
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}

/// Bearer token from the Authorization header, if one was sent
pub fn bearer_token(headers: &HeaderMap) -> Option<Result<&str, String>> {
    let value = headers.get(header::AUTHORIZATION)?;

    let token = value
        .to_str()
        .map_err(|e| format!("Invalid Authorization header: {}", e))
        .and_then(|raw| {
            raw.strip_prefix("Bearer ")
                .map(str::trim)
                .ok_or_else(|| "Authorization header must start with 'Bearer '".to_string())
        });

    Some(token)
}

/// Request ID middleware - adds a unique ID to each request
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id: String = req
        .headers()
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(request_id.clone()));

    tracing::info!(
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
        "Incoming request"
    );

    let mut response = next.run(req).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", header_value);
    }

    response
}

/// Request context middleware - adds context to each request
pub async fn request_context_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let client_ip = extract_client_ip(&req);
    let user_agent = extract_user_agent(req.headers());

    let context = RequestContext::new(request_id, client_ip, user_agent);
    req.extensions_mut().insert(context);

    next.run(req).await
}

/// Resolve the bearer token into a [`Caller`] for handlers and the rate limiter.
///
/// A token whose Pro flag has lapsed still authenticates; the caller is
/// treated as non-Pro and the stored flag is queued for revocation.
pub async fn caller_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let caller = match bearer_token(req.headers()) {
        None => Caller::Anonymous,
        Some(Err(reason)) => Caller::Rejected(reason),
        Some(Ok(token)) => {
            match state
                .auth_service
                .validate_token(token)
                .and_then(|claims| evaluate_claims(&claims, Utc::now()))
            {
                Ok(evaluated) => {
                    if evaluated.pro_lapsed {
                        debug!(user_id = %evaluated.actor.user_id, "Token carries a lapsed Pro flag");
                        state.job_sender.revoke_expired_pro(evaluated.actor.user_id);
                    }
                    Caller::Authenticated(evaluated.actor)
                }
                Err(e) => Caller::Rejected(e.to_string()),
            }
        }
    };

    req.extensions_mut().insert(caller);
    next.run(req).await
}

/// Custom key extractor for rate limiting that considers user authentication
#[derive(Clone)]
pub struct AuthAwareKeyExtractor;

impl KeyExtractor for AuthAwareKeyExtractor {
    type Key = String;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, tower_governor::GovernorError> {
        if let Some(Caller::Authenticated(actor)) = req.extensions().get::<Caller>() {
            Ok(format!("user:{}", actor.user_id))
        } else {
            let ip = extract_client_ip(req);
            Ok(format!("ip:{}", ip))
        }
    }
}
