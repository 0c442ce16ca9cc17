use crate::auth::models::AuthSession;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use brandmark_core::models::{UploadRequest, UploadTicket};
use std::sync::Arc;
use uuid::Uuid;

/// Issue a single-use capability URL for a direct upload to storage
#[utoipa::path(
    post,
    path = "/api/v0/organizations/{owner_id}/uploads/direct",
    tag = "uploads",
    params(
        ("owner_id" = Uuid, Path, description = "Organization that will own the object")
    ),
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Upload ticket issued", body = UploadTicket),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 403, description = "Not an administrator of this organization", body = ErrorResponse),
        (status = 413, description = "Declared size above the limit", body = ErrorResponse),
        (status = 415, description = "Content type not allowed", body = ErrorResponse),
        (status = 502, description = "Storage gateway error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        owner_id = %owner_id,
        user_id = %session.user_id,
        operation = "issue_upload_ticket"
    )
)]
pub async fn issue_upload_ticket(
    session: AuthSession,
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let ticket = state
        .ticket_issuer
        .issue_ticket(&session, owner_id, &request)
        .await?;

    Ok(Json(ticket))
}
