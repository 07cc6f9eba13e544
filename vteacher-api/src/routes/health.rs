//! Health Check and Latency Probe Endpoints
//!
//! - /health - store connectivity check
//! - /sleep/{ms} - answers after a delay, for exercising pending states

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use vteacher_storage::RecordStore;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Longest delay `/sleep` will honour.
pub const MAX_SLEEP_MS: u64 = 60_000;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepResponse {
    pub ok: bool,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health - Store connectivity check
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let error = state.store().list().await.err().map(|e| e.to_string());
    let status = if error.is_none() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        error,
    };

    let status_code = match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

/// GET /sleep/{ms} - Respond after `ms` milliseconds
pub async fn sleep(Path(ms): Path<String>) -> ApiResult<Json<SleepResponse>> {
    let ms = ms
        .parse::<u64>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid delay: {}", ms)))?;
    if ms > MAX_SLEEP_MS {
        return Err(ApiError::invalid_input(format!(
            "Delay must be at most {}ms",
            MAX_SLEEP_MS
        )));
    }
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(Json(SleepResponse { ok: true }))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/sleep/:ms", get(sleep))
}
