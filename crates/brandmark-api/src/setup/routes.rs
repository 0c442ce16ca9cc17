//! Route configuration and setup

use crate::api_doc::openapi_spec;
use crate::auth::middleware::auth_middleware;
use crate::constants::{API_PREFIX, HTTP_CONCURRENCY_LIMIT, STORAGE_PREFIX};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use brandmark_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Bytes allowed on top of the logo limit so oversized payloads reach the gateway
/// and get its error instead of a bare transport rejection.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let body_limit = body_limit(config);

    let protected = protected_routes().layer(axum::middleware::from_fn_with_state(
        state.auth.clone(),
        auth_middleware,
    ));

    let app = public_routes()
        .nest(API_PREFIX, protected)
        .merge(storage_routes(&state, body_limit))
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn body_limit(config: &Config) -> usize {
    usize::try_from(config.upload().logo_max_size_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_SLACK)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::OPTIONS,
    ];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Public routes (no authentication required)
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(openapi_spec()) }),
        )
}

/// Routes that require a session token
fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/organizations/{owner_id}/uploads/direct",
            post(handlers::uploads::issue_upload_ticket),
        )
        .route(
            "/organizations/{owner_id}/settings",
            get(handlers::settings::get_settings).patch(handlers::settings::update_settings),
        )
        .route(
            "/organizations/{owner_id}/settings/logo",
            post(handlers::settings::finalize_logo),
        )
}

/// Capability routes of the filesystem gateway, mounted only when it is active.
#[cfg(feature = "storage-local")]
fn storage_routes(state: &AppState, body_limit: usize) -> Router<Arc<AppState>> {
    if state.local_storage.is_none() {
        return Router::new();
    }
    Router::new()
        .route(
            &format!("{}/{{*key}}", STORAGE_PREFIX),
            get(handlers::storage::get_object).put(handlers::storage::put_object),
        )
        .layer(DefaultBodyLimit::max(body_limit))
}

#[cfg(not(feature = "storage-local"))]
fn storage_routes(_state: &AppState, _body_limit: usize) -> Router<Arc<AppState>> {
    tracing::debug!(prefix = STORAGE_PREFIX, "Local storage routes not compiled in");
    Router::new()
}
