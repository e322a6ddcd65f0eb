use axum::{
    Router,
    routing::{get, post},
};

use crate::{AppState, handlers::catalog};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/images",
            get(catalog::list_images_handler).post(catalog::upload_image_handler),
        )
        .route("/images/search", post(catalog::search_images_handler))
        .route("/images/delete", post(catalog::delete_image_form_handler))
        .route(
            "/images/{id}",
            get(catalog::get_image_handler).delete(catalog::delete_image_handler),
        )
}
