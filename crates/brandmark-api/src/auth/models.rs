use crate::error::HttpAppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use brandmark_core::models::SessionContext;
use brandmark_core::AppError;
use std::ops::Deref;

/// Session context extracted from the JWT and stored in request extensions
#[derive(Debug, Clone)]
pub struct AuthSession(pub SessionContext);

impl Deref for AuthSession {
    type Target = SessionContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSession>()
            .cloned()
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthenticated(
                    "Missing session context".to_string(),
                ))
            })
    }
}
