/// Health check endpoint
///
/// Reports whether the storage backend can serve requests.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "backend": "postgres",
///   "database": "connected"
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Storage backend in use
    pub backend: String,

    /// Database status
    pub database: String,
}

/// Health check handler
///
/// Answers `200` when the backend responds and `503` otherwise; the body is
/// the same shape either way.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, code, database) = match state.repos.ping().await {
        Ok(()) => ("healthy", StatusCode::OK, "connected"),
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, "disconnected")
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: taskboard_shared::VERSION.to_string(),
            backend: state.repos.backend_name().to_string(),
            database: database.to_string(),
        }),
    )
}
