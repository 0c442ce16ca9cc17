use crate::auth::jwt::JwtService;
use crate::auth::models::AuthSession;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use brandmark_core::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: JwtService,
}

/// Resolve the bearer token into a session and attach it to the request.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthenticated(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return HttpAppError(AppError::Unauthenticated(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    match auth_state.jwt.validate_token(token) {
        Ok(session) => {
            tracing::debug!(
                user_id = %session.user_id,
                organization_id = %session.organization_id,
                role = %session.role,
                "Request authenticated"
            );
            request.extensions_mut().insert(AuthSession(session));
            next.run(request).await
        }
        Err(e) => HttpAppError(e).into_response(),
    }
}
