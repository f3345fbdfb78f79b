use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct NamespaceHealth {
    pub name: String,
    pub storage: String,
    pub backend: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub storage_backend: String,
    pub max_file_size_mb: usize,
    pub namespaces: Vec<NamespaceHealth>,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut namespaces = Vec::with_capacity(state.namespaces.len());
    let mut healthy = true;

    for service in &state.namespaces {
        let storage = service.storage();
        // A missing key still proves the backend answers.
        let storage_status = match storage.exists("health-check").await {
            Ok(_) => "connected",
            Err(e) => {
                tracing::warn!("Storage health check failed for {}: {}", service.namespace().name, e);
                healthy = false;
                "disconnected"
            }
        };

        namespaces.push(NamespaceHealth {
            name: service.namespace().name.clone(),
            storage: storage_status.to_string(),
            backend: storage.backend_name().to_string(),
        });
    }

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        storage_backend: state.config.storage_backend.as_str().to_string(),
        max_file_size_mb: state.config.max_file_size / 1024 / 1024,
        namespaces,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
