//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Images and text
        .route(
            "/scrape",
            get(handlers::scrape_post_get).post(handlers::scrape_post),
        )
        .route("/scrape/images-only", post(handlers::scrape_images_only))
        .route("/scrape/page", post(handlers::scrape_page))
        // Video
        .route(
            "/scrape/video",
            get(handlers::scrape_video_get).post(handlers::scrape_video),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
