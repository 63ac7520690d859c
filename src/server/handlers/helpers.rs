//! Request types and error responses shared by the handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::scrapers::url::is_target_domain;

/// Default number of posts for a page crawl.
pub const DEFAULT_NUM_POSTS: usize = 10;

/// Largest page crawl a single request may ask for.
pub const MAX_NUM_POSTS: usize = 20;

/// Body of the single-post endpoints.
#[derive(Debug, Deserialize)]
pub struct PostUrlRequest {
    pub url: String,
}

/// Query string of the single-post GET endpoints.
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: String,
}

/// Body of `POST /scrape/page`.
#[derive(Debug, Deserialize)]
pub struct PageRequest {
    /// Listing address or bare page name.
    pub page_url: String,
    #[serde(default = "default_num_posts")]
    pub num_posts: usize,
}

fn default_num_posts() -> usize {
    DEFAULT_NUM_POSTS
}

/// Response of `POST /scrape/images-only`.
#[derive(Debug, Serialize)]
pub struct ImagesOnlyResponse {
    pub success: bool,
    pub url: String,
    pub total_images: usize,
    pub images: Vec<String>,
}

/// An error rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: Option<&str>, fallback: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail.unwrap_or(fallback))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

impl From<ScrapeError> for ApiError {
    fn from(e: ScrapeError) -> Self {
        tracing::error!("Request failed: {}", e);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Reject addresses outside the target domain.
pub fn require_target_domain(url: &str) -> ApiResult<()> {
    if is_target_domain(url) {
        Ok(())
    } else {
        Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "URL must be a facebook.com address",
        ))
    }
}
