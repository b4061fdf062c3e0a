//! Bearer-token authentication extractor.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use crate::auth::{AuthError, Claims};
use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Extractor that requires a valid `Authorization: Bearer <token>` header.
///
/// Rejections are written as the standard error envelope:
/// - missing header or malformed value: 401
/// - token signed with a non-HMAC algorithm: 400
/// - bad signature or expired token: 401
///
/// On success the request span's `user_id` field is filled in.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireAuth(claims): RequireAuth) -> String {
///     claims.email
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub Claims);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::unauthorized("missing authorization header"))?;

        let token = bearer_token(header.to_str().map_err(|_| AuthError::MalformedToken)?)?;

        let state = AppState::from_ref(state);
        let claims = state.tokens().verify(token)?;

        Span::current().record("user_id", tracing::field::display(&claims.sub));
        set_sentry_user(&claims.sub, Some(&claims.email));

        Ok(Self(claims))
    }
}

/// The token part of a `Bearer <token>` header value.
fn bearer_token(value: &str) -> Result<&str, AuthError> {
    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MalformedToken)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() || token.contains(' ') {
        return Err(AuthError::MalformedToken);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi").ok(), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc").ok(), Some("abc"));
        assert!(bearer_token("Basic abc").is_err());
        assert!(bearer_token("Bearer").is_err());
        assert!(bearer_token("Bearer ").is_err());
        assert!(bearer_token("Bearer a b").is_err());
    }
}
