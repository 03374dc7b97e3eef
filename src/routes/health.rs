use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use super::AppState;

const CHECK_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub database: HealthStatus,
    pub cache: HealthStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Individual health status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub latency_ms: Option<u64>,
}

impl HealthStatus {
    fn healthy(latency_ms: u64) -> Self {
        Self {
            status: "healthy".to_string(),
            latency_ms: Some(latency_ms),
        }
    }

    fn unhealthy() -> Self {
        Self {
            status: "unhealthy".to_string(),
            latency_ms: None,
        }
    }

    fn disabled() -> Self {
        Self {
            status: "disabled".to_string(),
            latency_ms: None,
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

async fn probe<F, T, E>(check: F) -> HealthStatus
where
    F: Future<Output = Result<T, E>>,
{
    let start = Instant::now();

    match tokio::time::timeout(CHECK_TIMEOUT, check).await {
        Ok(Ok(_)) => HealthStatus::healthy(start.elapsed().as_millis() as u64),
        Ok(Err(_)) | Err(_) => HealthStatus::unhealthy(),
    }
}

/// Health check endpoint; 503 when the database is unreachable
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = probe(state.registry.ping()).await;

    let cache = match &state.cache {
        Some(cache) => probe(cache.ping()).await,
        None => HealthStatus::disabled(),
    };

    let (code, status) = if !database.is_healthy() {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    } else if cache.status == "unhealthy" {
        (StatusCode::OK, "degraded")
    } else {
        (StatusCode::OK, "healthy")
    };

    let response = HealthCheckResponse {
        status: status.to_string(),
        database,
        cache,
        timestamp: chrono::Utc::now(),
    };

    (code, Json(response))
}
