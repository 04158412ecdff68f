//! Identity resolution for protected routes.
//!
//! The middleware turns a presented token string into a live token + user
//! pair, rejects unverified accounts, and injects the result into the
//! request extensions as a typed [`Identity`]. It never mutates user or
//! token state; every rejection is terminal and the protected handler is
//! not invoked.

use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;

use super::storage::{lookup_access_token, lookup_user_by_id, verification_pending};
use super::types::{AccessToken, User};
use crate::api::error::UserError;

/// Resolved identity attached to the request for downstream handlers.
#[derive(Clone, Debug)]
pub struct Identity {
    pub user: User,
    pub token: AccessToken,
}

pub async fn resolve_identity(
    Extension(pool): Extension<PgPool>,
    mut request: Request,
    next: Next,
) -> Result<Response, UserError> {
    let token_id = extract_access_token(request.headers(), request.uri().query())
        .ok_or(UserError::Authorization("missing access token"))?;

    // Expired tokens do not resolve; expiry is enforced by the lookup itself.
    let token = lookup_access_token(&pool, &token_id)
        .await?
        .ok_or(UserError::Authorization("invalid access token"))?;

    let user = lookup_user_by_id(&pool, &token.user_id)
        .await?
        .ok_or(UserError::Authorization("invalid access token (no user)"))?;

    // A pending signup verification means the account may not be used yet.
    if verification_pending(&pool, &user.id).await? {
        return Err(UserError::Authorization("unverified account"));
    }

    request.extensions_mut().insert(Identity { user, token });

    Ok(next.run(request).await)
}

/// Read the token from the `Authorization` header (optional `Bearer` prefix),
/// falling back to an `access_token` request parameter, in that order.
pub(super) fn extract_access_token(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    if let Some(token) = header_token(headers) {
        return Some(token);
    }
    query_token(query)
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .unwrap_or(trimmed)
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn query_token(query: Option<&str>) -> Option<String> {
    // Token ids are url-safe base64, so no percent-decoding is needed here.
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "access_token")
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_token_without_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("raw-token"));
        assert_eq!(
            extract_access_token(&headers, None),
            Some("raw-token".to_string())
        );
    }

    #[test]
    fn header_token_strips_bearer_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(
            extract_access_token(&headers, None),
            Some("abc123".to_string())
        );

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc123"));
        assert_eq!(
            extract_access_token(&headers, None),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn header_wins_over_query_parameter() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("from-header"));
        assert_eq!(
            extract_access_token(&headers, Some("access_token=from-query")),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn query_parameter_is_the_fallback() {
        let headers = HeaderMap::new();
        assert_eq!(
            extract_access_token(&headers, Some("foo=bar&access_token=tok123")),
            Some("tok123".to_string())
        );
    }

    #[test]
    fn empty_values_are_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_access_token(&headers, None), None);
        assert_eq!(extract_access_token(&HeaderMap::new(), None), None);
        assert_eq!(
            extract_access_token(&HeaderMap::new(), Some("access_token=")),
            None
        );
    }
}
