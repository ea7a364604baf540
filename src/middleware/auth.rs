use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header carrying the authenticated user id.
///
/// Token verification happens upstream (reverse proxy / auth middleware);
/// by the time a request reaches these handlers the identity has already
/// been established and is passed through this header.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user for a request
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok())
            .map(AuthUser)
            .ok_or_else(|| AppError::Forbidden("Missing authenticated user".to_string()))
    }
}
