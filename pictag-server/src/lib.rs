//! # Pictag Server
//!
//! HTTP front end of the Pictag image catalog. Browsers post an image URL or
//! a local file, the configured label provider describes it, and the catalog
//! can then be browsed and searched by label.
//!
//! Routes live under `/api/v1`; uploaded files are served from `/uploads`.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
pub use infra::errors::{AppError, AppResult};

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer,
};

/// Path prefix under which the upload directory is exposed.
pub const UPLOADS_ROUTE: &str = "/uploads";

pub fn create_app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.catalog.upload_dir());

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(routes::create_api_router())
        .nest_service(UPLOADS_ROUTE, uploads)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(state.max_upload_bytes)),
        )
        .with_state(state)
}
