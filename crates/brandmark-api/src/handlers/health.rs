use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub settings_store: String,
    pub storage_backend: String,
}

/// Liveness plus a settings store check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service healthy", body = HealthCheckResponse),
        (status = 503, description = "Settings store unreachable", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let mut response = HealthCheckResponse {
        status: "healthy".to_string(),
        settings_store: "unknown".to_string(),
        storage_backend: state.storage.backend_type().to_string(),
    };

    let healthy = match tokio::time::timeout(TIMEOUT, state.settings_repository.get(Uuid::nil())).await
    {
        Ok(Ok(_)) => {
            response.settings_store = "healthy".to_string();
            true
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Settings store health check failed");
            response.settings_store = format!("unhealthy: {}", e);
            false
        }
        Err(_) => {
            tracing::error!("Settings store health check timed out");
            response.settings_store = "timeout".to_string();
            false
        }
    };

    if healthy {
        (StatusCode::OK, Json(response))
    } else {
        response.status = "unhealthy".to_string();
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
