//! Location image upload and serving handlers.
//!
//! Image bytes are always served with no-cache headers: clients re-fetch
//! after every upload, and stable URLs would otherwise keep showing the old
//! picture. The `v` query parameter on image URLs is a cache buster and is
//! ignored here.

use axum::extract::{Path, State};
use axum::http::header::{self, HeaderName};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine as _;
use bytes::Bytes;
use serde::Serialize;

use lp_core::{Error, LocationId};
use lp_pipeline::{gateway, Served};

use crate::context::AppContext;
use crate::error::AppError;

const NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";
const IMAGE_SOURCE: HeaderName = HeaderName::from_static("x-image-source");

/// Response body of a successful upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub image_type: String,
    pub original_size: usize,
    pub stored_size: usize,
    pub has_thumbnail: bool,
    pub image_url: String,
}

/// JSON rendition of a location image.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDataResponse {
    /// `false` when the placeholder is returned.
    pub success: bool,
    pub image_type: String,
    /// Standard base64, no `data:` prefix.
    pub image_data: String,
}

fn parse_id(raw: &str) -> Result<LocationId, AppError> {
    raw.parse()
        .map_err(|_| Error::Validation(format!("Invalid location ID: {raw}")).into())
}

/// POST /api/locations/{id}/image
pub async fn upload_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError> {
    let id = parse_id(&id)?;
    let declared = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let outcome = ctx.ingestor.ingest(id, body.to_vec(), declared).await?;

    Ok(Json(UploadResponse {
        success: true,
        image_type: outcome.asset.mime_type.clone(),
        original_size: outcome.original_size,
        stored_size: outcome.stored_size(),
        has_thumbnail: outcome.has_thumbnail(),
        image_url: ctx.cache_buster.image_url(id),
    }))
}

/// DELETE /api/locations/{id}/image
///
/// The location keeps existing and serves the placeholder until the next
/// upload or backfill run.
pub async fn delete_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    let conn = lp_db::pool::get_conn(&ctx.db)?;
    if !lp_db::queries::location_images::clear_image(&conn, id)? {
        return Err(Error::not_found("location", id).into());
    }
    tracing::info!(location_id = %id, "Cleared location image");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/locations/{id}/image
pub async fn get_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    image_response(id, gateway::serve(&ctx.db, id, &ctx.fallback))
}

/// GET /api/locations/{id}/thumbnail
pub async fn get_thumbnail(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    image_response(id, gateway::serve_thumbnail(&ctx.db, id, &ctx.fallback))
}

/// GET /api/locations/{id}/image/data
pub async fn get_image_data(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<ImageDataResponse>, AppError> {
    let id = parse_id(&id)?;
    let served = gateway::serve(&ctx.db, id, &ctx.fallback);
    let success = matches!(served, Served::Stored { .. });
    let (bytes, mime_type) = served
        .into_parts()
        .ok_or_else(|| Error::not_found("location", id))?;

    Ok(Json(ImageDataResponse {
        success,
        image_type: mime_type,
        image_data: base64::engine::general_purpose::STANDARD.encode(bytes),
    }))
}

fn image_response(id: LocationId, served: Served) -> Result<Response, AppError> {
    let source = if served.is_fallback() {
        "fallback"
    } else {
        "stored"
    };
    let (bytes, mime_type) = served
        .into_parts()
        .ok_or_else(|| Error::not_found("location", id))?;

    let content_type = HeaderValue::from_str(&mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let mut response = (StatusCode::OK, bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers.insert(IMAGE_SOURCE, HeaderValue::from_static(source));
    Ok(response)
}
