//! Health check endpoints for probes and monitoring.

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use http::StatusCode;
use serde::Serialize;

use crate::AppState;

/// Detailed health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    /// Service name
    pub service: &'static str,
    /// Service version
    pub version: &'static str,
    /// ISO-8601 timestamp of the check
    pub timestamp: String,
    /// Individual subsystem statuses
    pub subsystems: SubsystemStatus,
}

/// Status of individual subsystems.
#[derive(Debug, Serialize)]
pub struct SubsystemStatus {
    /// Impact oracle status
    pub oracle: ComponentStatus,
}

/// Status of a single component.
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    /// Whether the component is healthy
    pub healthy: bool,
    /// Optional message with details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Number of models the component knows about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_count: Option<usize>,
}

/// Full health check with subsystem status.
#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let oracle = match state.oracle.list_models() {
        Ok(models) => ComponentStatus {
            healthy: true,
            message: None,
            model_count: Some(models.len()),
        },
        Err(error) => ComponentStatus {
            healthy: false,
            message: Some(error.to_string()),
            model_count: None,
        },
    };

    let overall_healthy = oracle.healthy;
    let health = HealthStatus {
        status: if overall_healthy {
            "healthy".to_string()
        } else {
            "unhealthy".to_string()
        },
        service: "ecometer",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        subsystems: SubsystemStatus { oracle },
    };

    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health))
}

/// Liveness probe. Succeeds whenever the process is running.
#[tracing::instrument(name = "health.liveness")]
pub async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe. Checks that the oracle can list models.
#[tracing::instrument(name = "health.readiness", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.oracle.list_models().is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    StatusCode::OK
}
