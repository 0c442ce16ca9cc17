use crate::auth::models::AuthSession;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::FinalizeOutcome;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use brandmark_core::models::{
    FinalizeLogoRequest, FinalizeLogoResponse, SettingsRecord, SettingsResponse,
    SettingsUpdateRequest,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

fn to_response(state: &AppState, record: SettingsRecord) -> SettingsResponse {
    let logo_url = record
        .logo_object_key
        .as_deref()
        .map(|key| state.storage.public_url(key));
    SettingsResponse::from_record(record, logo_url)
}

fn to_finalize_response(state: &AppState, outcome: FinalizeOutcome) -> FinalizeLogoResponse {
    FinalizeLogoResponse {
        settings: to_response(state, outcome.record),
        superseded_object_key: outcome.superseded_object_key,
    }
}

/// Get organization settings with the resolved logo URL
#[utoipa::path(
    get,
    path = "/api/v0/organizations/{owner_id}/settings",
    tag = "settings",
    params(
        ("owner_id" = Uuid, Path, description = "Organization ID")
    ),
    responses(
        (status = 200, description = "Current settings", body = SettingsResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 403, description = "Not a member of this organization", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(owner_id = %owner_id, user_id = %session.user_id))]
pub async fn get_settings(
    session: AuthSession,
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state.finalizer.get_settings(&session, owner_id).await?;
    Ok(Json(to_response(&state, record)))
}

/// Save the settings form, optionally committing a transferred logo in the same write
#[utoipa::path(
    patch,
    path = "/api/v0/organizations/{owner_id}/settings",
    tag = "settings",
    params(
        ("owner_id" = Uuid, Path, description = "Organization ID")
    ),
    request_body = SettingsUpdateRequest,
    responses(
        (status = 200, description = "Settings saved", body = FinalizeLogoResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 403, description = "Not an administrator of this organization", body = ErrorResponse),
        (status = 404, description = "Logo object not transferred", body = ErrorResponse),
        (status = 500, description = "Settings could not be persisted", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, request),
    fields(owner_id = %owner_id, user_id = %session.user_id, operation = "update_settings")
)]
pub async fn update_settings(
    session: AuthSession,
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<SettingsUpdateRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;

    let outcome = state
        .finalizer
        .save_settings(&session, owner_id, request.into_changes())
        .await?;

    Ok(Json(to_finalize_response(&state, outcome)))
}

/// Commit a transferred logo into the organization settings
#[utoipa::path(
    post,
    path = "/api/v0/organizations/{owner_id}/settings/logo",
    tag = "settings",
    params(
        ("owner_id" = Uuid, Path, description = "Organization ID")
    ),
    request_body = FinalizeLogoRequest,
    responses(
        (status = 200, description = "Logo committed", body = FinalizeLogoResponse),
        (status = 400, description = "Malformed object key", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 403, description = "Key belongs to another organization", body = ErrorResponse),
        (status = 404, description = "Object not transferred", body = ErrorResponse),
        (status = 413, description = "Stored object above the size limit", body = ErrorResponse),
        (status = 500, description = "Settings could not be persisted", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        owner_id = %owner_id,
        user_id = %session.user_id,
        object_key = %request.object_key,
        operation = "finalize_logo"
    )
)]
pub async fn finalize_logo(
    session: AuthSession,
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<FinalizeLogoRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let outcome = state
        .finalizer
        .finalize(&session, owner_id, &request.object_key)
        .await?;

    Ok(Json(to_finalize_response(&state, outcome)))
}
