//! Identity authentication for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::{AppState, error::ApiError};
use keystone_shared::{AppError, JwtError, Principal};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Finds the identity assertion: bearer header first, then the session cookie.
fn identity_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
    {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Authentication middleware that validates identity assertions.
///
/// This middleware:
/// 1. Takes the token from `Authorization: Bearer` or the session cookie
/// 2. Verifies it with the identity provider's secret
/// 3. Stores the [`Principal`] in request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = identity_token(request.headers(), &state.auth.session_cookie) else {
        return Err(AppError::Unauthorized("missing identity token".to_string()).into());
    };

    let claims = state.jwt_service.validate_identity(&token).map_err(|e| {
        let reason = match e {
            JwtError::Expired => "identity token has expired",
            _ => "invalid identity token",
        };
        ApiError(AppError::Unauthorized(reason.to_string()))
    })?;

    let principal = claims.principal();
    debug!(user_id = %principal.id, "Principal authenticated");

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Extractor for the authenticated principal.
///
/// ```ignore
/// async fn handler(AuthUser(principal): AuthUser) -> impl IntoResponse {
///     principal.id
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError(AppError::Unauthorized("authentication required".to_string())))
    }
}
