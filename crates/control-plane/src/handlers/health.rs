//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
}

/// Detailed health for `/api/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiHealthResponse {
    /// "ok" or "unhealthy"
    pub status: String,

    /// `OMNIPDF_SERVER_NAME`
    pub server: String,

    /// Workflow store backend and whether it answers
    pub store: ComponentStatus,

    /// Backend platform reachability
    pub platform: String,

    pub uptime_seconds: u64,

    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub backend: String,
    pub status: String,
}

fn connection_status(healthy: bool) -> String {
    let status = if healthy { "connected" } else { "disconnected" };
    status.to_string()
}

/// `GET /health`
///
/// Liveness only; returns as soon as the server is up.
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
    })
}

/// `GET /api/health`
///
/// `503 Service Unavailable` when the workflow store or the platform does
/// not answer.
pub async fn api_health(State(state): State<AppState>) -> (StatusCode, Json<ApiHealthResponse>) {
    let store_healthy = state.workflows.health_check().await;
    let platform_healthy = state.entities.ping().await;
    let healthy = store_healthy && platform_healthy;

    let response = ApiHealthResponse {
        status: if healthy { "ok" } else { "unhealthy" }.to_string(),
        server: state.config.server_name.clone(),
        store: ComponentStatus {
            backend: state.workflows.backend().to_string(),
            status: connection_status(store_healthy),
        },
        platform: connection_status(platform_healthy),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::platform::MemoryPlatform;
    use crate::store::MemoryWorkflowStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await;
        assert_eq!(response.status, "ok");
    }

    #[tokio::test]
    async fn test_api_health_in_memory() {
        let platform = Arc::new(MemoryPlatform::new());
        let config = AppConfig {
            server_name: "pdf-cp-eu".to_string(),
            ..AppConfig::default()
        };
        let state = AppState::new(
            config,
            Arc::new(MemoryWorkflowStore::new()),
            platform.clone(),
            platform.clone(),
            platform,
        );

        let (code, Json(body)) = api_health(State(state)).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body.server, "pdf-cp-eu");
        assert_eq!(body.store.backend, "memory");
        assert_eq!(body.platform, "connected");
    }
}
