pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::photo_service::PhotoService;
use axum::{Router, middleware::from_fn, routing::get};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::photos::upload_photo,
        api::handlers::photos::list_photos,
        api::handlers::photos::serve_file,
        api::handlers::photos::download_photos,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::UploadResponse,
            models::PhotoSummary,
            models::DownloadRequest,
            models::ErrorResponse,
            api::handlers::health::HealthResponse,
            api::handlers::health::NamespaceHealth,
        )
    ),
    tags(
        (name = "photos", description = "Photo upload, listing and download. Every namespace exposes the same routes under its own prefix."),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub namespaces: Vec<Arc<PhotoService>>,
}

pub fn create_app(state: AppState) -> Router {
    let mut app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route(
            "/health",
            get(api::handlers::health::health_check).with_state(state.clone()),
        );

    for service in &state.namespaces {
        app = app.merge(api::handlers::photos::routes(service.clone()));
    }

    app.fallback(api::handlers::fallback::not_found)
        .layer(from_fn(api::middleware::cors::cors_middleware))
}
