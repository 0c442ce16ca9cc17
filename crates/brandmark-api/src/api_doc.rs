//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use brandmark_core::models;

/// Registers the `bearer_auth` scheme referenced by protected operations.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Brandmark API",
        version = "0.1.0",
        description = "Direct-to-storage logo uploads. Clients obtain a single-use upload ticket, PUT the payload straight to the blob store and then finalize the object into the organization settings. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::health::health_check,
        handlers::uploads::issue_upload_ticket,
        handlers::settings::get_settings,
        handlers::settings::update_settings,
        handlers::settings::finalize_logo,
    ),
    components(
        schemas(
            models::UploadRequest,
            models::UploadTicket,
            models::AssetPurpose,
            models::SettingsUpdateRequest,
            models::SettingsResponse,
            models::FinalizeLogoRequest,
            models::FinalizeLogoResponse,
            handlers::health::HealthCheckResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "uploads", description = "Upload ticket issuance"),
        (name = "settings", description = "Organization settings and logo finalization"),
        (name = "storage", description = "Filesystem gateway capability endpoints"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(feature = "storage-local")]
#[derive(OpenApi)]
#[openapi(paths(handlers::storage::put_object, handlers::storage::get_object))]
struct StorageApiDoc;

/// The served spec, including the filesystem gateway routes when compiled in.
pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    #[allow(unused_mut)]
    let mut spec = ApiDoc::openapi();
    #[cfg(feature = "storage-local")]
    spec.merge(StorageApiDoc::openapi());
    spec
}
