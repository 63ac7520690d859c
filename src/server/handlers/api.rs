//! Service descriptor and health endpoints.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use super::super::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service descriptor listing the available endpoints.
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "status": "online",
        "message": "Public post media extraction API",
        "version": VERSION,
        "endpoints": {
            "POST /scrape": "Images and text of a post",
            "GET /scrape?url=...": "Images and text of a post (GET)",
            "POST /scrape/images-only": "Image addresses of a post",
            "POST /scrape/page": "Posts from a page listing",
            "GET /scrape/video?url=...": "Video address of a post (GET)",
            "POST /scrape/video": "Video address of a post",
            "GET /health": "Health check"
        }
    }))
}

/// Health check endpoint for container orchestration.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let browser = state.resolver.session().is_running().await;
    Json(json!({
        "status": "healthy",
        "version": VERSION,
        "browser_running": browser,
    }))
}
