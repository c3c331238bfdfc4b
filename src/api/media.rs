/// Media serving endpoint
use crate::{
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};

/// Build media routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/media/:key", get(get_media))
}

/// Serve a stored media object by key
///
/// Keys are immutable, so responses carry long-lived cache headers.
async fn get_media(State(ctx): State<AppContext>, Path(key): Path<String>) -> ApiResult<Response> {
    let (data, content_type) = ctx
        .media
        .open(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Media not found: {}", key)))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, data.len().to_string())
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(axum::body::Body::from(data))
        .map_err(|e| ApiError::Internal(format!("Failed to build media response: {}", e)))
}
