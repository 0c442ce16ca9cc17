//! Capability endpoints of the filesystem gateway.
//!
//! These routes stand in for the blob store when the local backend is active. They
//! authenticate with the signed token in the URL, never with a session.

use crate::constants::UPLOAD_TOKEN_PARAM;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
};
use brandmark_core::constants::CONTENT_MD5_HEADER;
use brandmark_core::{AppError, ContentDigest};
use brandmark_storage::LocalStorage;
use std::collections::HashMap;
use std::sync::Arc;

fn local_storage(state: &AppState) -> Result<&LocalStorage, HttpAppError> {
    state.local_storage.as_ref().ok_or_else(|| {
        HttpAppError(AppError::NotFound(
            "Local storage routes are not enabled".to_string(),
        ))
    })
}

/// Accept a PUT to a capability URL issued by the ticket endpoint
#[utoipa::path(
    put,
    path = "/storage/{key}",
    tag = "storage",
    params(
        ("key" = String, Path, description = "Object key from the upload ticket"),
        ("token" = String, Query, description = "Capability token from the transfer URL")
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Object stored, or an identical replay; ETag carries the hex digest"),
        (status = 400, description = "Digest mismatch or header constraint violated", body = ErrorResponse),
        (status = 403, description = "Invalid capability token", body = ErrorResponse),
        (status = 409, description = "A different object is stored under the key", body = ErrorResponse),
        (status = 410, description = "Capability token expired", body = ErrorResponse),
        (status = 413, description = "Payload above the signed size limit", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params, headers, body), fields(object_key = %key, byte_size = body.len()))]
pub async fn put_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let storage = local_storage(&state)?;
    let token = params.get(UPLOAD_TOKEN_PARAM).ok_or_else(|| {
        HttpAppError(AppError::Unauthorized(
            "Missing capability token".to_string(),
        ))
    })?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let content_md5 = headers
        .get(CONTENT_MD5_HEADER)
        .and_then(|v| v.to_str().ok());

    let stored = storage
        .accept_put(&key, token, content_type, content_md5, body)
        .await?;

    let etag = stored
        .digest
        .as_deref()
        .and_then(|d| ContentDigest::parse(d).ok())
        .map(|d| format!("\"{}\"", d.to_hex()))
        .unwrap_or_default();

    tracing::info!(
        object_key = %stored.object_key,
        byte_size = stored.byte_size,
        "Object stored through capability URL"
    );

    Ok((StatusCode::OK, [(header::ETAG, etag)]))
}

/// Serve a public object
#[utoipa::path(
    get,
    path = "/storage/{key}",
    tag = "storage",
    params(
        ("key" = String, Path, description = "Object key")
    ),
    responses(
        (status = 200, description = "Object bytes"),
        (status = 404, description = "No public object under this key", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(object_key = %key))]
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let storage = local_storage(&state)?;
    let (data, content_type) = storage.read_public(&key).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable".to_string()),
        ],
        data,
    ))
}
