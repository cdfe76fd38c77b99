//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.settings.request_body_limit();

    let api_v1 = Router::new()
        .route("/week-key", get(handlers::get_week_key))
        // Schedules
        .route("/schedules", get(handlers::list_schedules))
        .route("/schedules/place", post(handlers::place_schedule))
        .route(
            "/schedules/{id}",
            get(handlers::get_schedule).delete(handlers::delete_schedule),
        )
        .route("/weeks/{week_key}/schedules", get(handlers::list_week_schedules))
        .route("/incidents", get(handlers::list_incidents))
        // Course material files
        .route("/files", get(handlers::list_files).post(handlers::upload_file))
        .route("/files/{id}", axum::routing::delete(handlers::delete_file))
        .route("/files/{id}/content", get(handlers::download_file));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerSettings;
    use crate::db::repositories::LocalRepository;
    use crate::storage::MemoryFileStore;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let state = AppState::new(
            Arc::new(LocalRepository::new()),
            Arc::new(MemoryFileStore::new()),
            ServerSettings::default(),
        );
        let _router = create_router(state);
    }

    #[test]
    fn test_router_accepts_unvalidated_extreme_limits() {
        let settings = ServerSettings {
            max_upload_bytes: usize::MAX,
            incident_capacity: usize::MAX,
            ..ServerSettings::default()
        };
        let state = AppState::new(
            Arc::new(LocalRepository::new()),
            Arc::new(MemoryFileStore::new()),
            settings,
        );
        let _router = create_router(state);
    }
}
