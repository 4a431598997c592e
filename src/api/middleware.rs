//! API key authentication and caller identity.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::config::SecurityConfig;

/// Header carrying the authenticated user id, set by the auth provider's proxy.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller's user id, `None` for anonymous requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer(pub Option<String>);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(user_id(&parts.headers)))
    }
}

/// The caller's user id; rejects anonymous requests with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn(pub String);

impl<S> FromRequestParts<S> for SignedIn
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id(&parts.headers).map(SignedIn).ok_or_else(|| {
            tracing::debug!("Rejecting anonymous request to {}", parts.uri.path());
            (
                StatusCode::UNAUTHORIZED,
                format!("Missing {} header", USER_ID_HEADER),
            )
        })
    }
}

fn user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
}

/// Rejects requests without the configured bearer key. A no-op when no key
/// is configured.
pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected_key) = &config.api_key else {
        return Ok(next.run(request).await);
    };

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    match auth_header.map(|h| h.strip_prefix("Bearer ")) {
        Some(Some(token)) if token == expected_key => Ok(next.run(request).await),
        Some(Some(_)) => {
            tracing::warn!("Invalid API key provided");
            Err(StatusCode::UNAUTHORIZED)
        }
        Some(None) => {
            tracing::warn!("Invalid Authorization header format");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("Missing Authorization header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn user_id_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  alice "));
        assert_eq!(user_id(&headers), Some("alice".to_string()));
    }

    #[test]
    fn blank_user_id_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("   "));
        assert_eq!(user_id(&headers), None);
        assert_eq!(user_id(&HeaderMap::new()), None);
    }
}
