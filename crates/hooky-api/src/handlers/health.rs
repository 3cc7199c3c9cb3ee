//! Health check handlers for service monitoring.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::AppState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: HealthStatus,
    /// Timestamp when health check was performed
    pub timestamp: DateTime<Utc>,
    /// Number of registered applications
    pub applications: usize,
    /// Service version information
    pub version: String,
}

/// Overall health status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Serving with at least one application
    Healthy,
    /// Serving, but every notification will be ignored
    Degraded,
}

impl HealthResponse {
    /// Builds a report for a registry holding `applications` entries.
    pub fn for_applications(applications: usize) -> Self {
        let status =
            if applications == 0 { HealthStatus::Degraded } else { HealthStatus::Healthy };

        Self {
            status,
            timestamp: Utc::now(),
            applications,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Health check endpoint handler.
///
/// Both statuses answer `200 OK`; an empty registry is still a running
/// service.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Response {
    let response = HealthResponse::for_applications(state.dispatcher.apps().len());

    debug!(status = ?response.status, applications = response.applications, "health check completed");

    (StatusCode::OK, Json(response)).into_response()
}

/// Liveness check endpoint for orchestrators.
#[instrument(name = "liveness_check", skip_all)]
pub async fn liveness_check(State(_state): State<AppState>) -> Response {
    debug!("performing liveness check");

    let response = serde_json::json!({
        "status": "alive",
        "timestamp": Utc::now(),
        "service": "hooky"
    });

    (StatusCode::OK, Json(response)).into_response()
}
