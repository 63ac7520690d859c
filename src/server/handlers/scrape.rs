//! Post, page and video resolution endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::super::AppState;
use super::helpers::{
    require_target_domain, ApiError, ApiResult, ImagesOnlyResponse, PageRequest, PostUrlRequest,
    UrlQuery, MAX_NUM_POSTS,
};
use crate::models::{PageCrawlResult, PostResult, VIDEO_NOT_FOUND};

async fn resolve_media(state: &AppState, url: &str) -> ApiResult<PostResult> {
    require_target_domain(url)?;
    let result = state.resolver.resolve_post_media(url).await?;
    if !result.success {
        return Err(ApiError::not_found(result.error.as_deref(), "Post not found"));
    }
    Ok(result)
}

async fn resolve_video(state: &AppState, url: &str) -> ApiResult<PostResult> {
    require_target_domain(url)?;
    let result = state.resolver.resolve_post_video(url).await?;
    if !result.success {
        return Err(ApiError::not_found(result.error.as_deref(), VIDEO_NOT_FOUND));
    }
    Ok(result)
}

/// `POST /scrape`
pub async fn scrape_post(
    State(state): State<AppState>,
    Json(request): Json<PostUrlRequest>,
) -> ApiResult<Json<PostResult>> {
    info!("POST /scrape {}", request.url);
    resolve_media(&state, &request.url).await.map(Json)
}

/// `GET /scrape?url=`
pub async fn scrape_post_get(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<Json<PostResult>> {
    info!("GET /scrape {}", query.url);
    resolve_media(&state, &query.url).await.map(Json)
}

/// `POST /scrape/images-only`
pub async fn scrape_images_only(
    State(state): State<AppState>,
    Json(request): Json<PostUrlRequest>,
) -> ApiResult<Json<ImagesOnlyResponse>> {
    let result = resolve_media(&state, &request.url).await?;
    let images = result
        .post_payload()
        .map(|payload| payload.image_urls())
        .unwrap_or_default();

    Ok(Json(ImagesOnlyResponse {
        success: true,
        url: request.url,
        total_images: images.len(),
        images,
    }))
}

/// `POST /scrape/page`
pub async fn scrape_page(
    State(state): State<AppState>,
    Json(request): Json<PageRequest>,
) -> ApiResult<Json<PageCrawlResult>> {
    if !(1..=MAX_NUM_POSTS).contains(&request.num_posts) {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("num_posts must be between 1 and {}", MAX_NUM_POSTS),
        ));
    }

    info!("POST /scrape/page {} ({} posts)", request.page_url, request.num_posts);
    let result = state
        .resolver
        .resolve_page_listing(&request.page_url, request.num_posts)
        .await?;
    if !result.success {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            result.error.unwrap_or_else(|| "Page crawl failed".to_string()),
        ));
    }
    Ok(Json(result))
}

/// `GET /scrape/video?url=`
pub async fn scrape_video_get(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<Json<PostResult>> {
    info!("GET /scrape/video {}", query.url);
    resolve_video(&state, &query.url).await.map(Json)
}

/// `POST /scrape/video`
pub async fn scrape_video(
    State(state): State<AppState>,
    Json(request): Json<PostUrlRequest>,
) -> ApiResult<Json<PostResult>> {
    info!("POST /scrape/video {}", request.url);
    resolve_video(&state, &request.url).await.map(Json)
}
