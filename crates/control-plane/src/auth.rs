//! Caller authentication for the `/api` routes.
//!
//! The session token is taken from `Authorization: Bearer <token>`, the
//! `x-session-token` header or a `session_token` cookie, and resolved by the
//! platform. The resolved [`Caller`] is stored in request extensions for the
//! handlers.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::platform::{Authenticator, Caller};

pub const UNAUTHORIZED: &str = "Unauthorized";

/// State for [`require_caller`].
#[derive(Clone)]
pub struct AuthState {
    pub authenticator: Arc<dyn Authenticator>,
}

pub async fn require_caller(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = extract_session_token(request.headers()) else {
        debug!("No session token provided");
        return Err(AppError::Auth(UNAUTHORIZED.to_string()));
    };

    let caller: Caller = state
        .authenticator
        .authenticate(&token)
        .await
        .map_err(|e| AppError::Internal(format!("Session validation failed: {}", e)))?
        .ok_or_else(|| {
            warn!("Invalid or expired session token");
            AppError::Auth(UNAUTHORIZED.to_string())
        })?;

    debug!(caller = %caller.email, "Authenticated caller");
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(token) = header("authorization").and_then(|v| v.strip_prefix("Bearer ")) {
        return Some(token.trim().to_string());
    }

    if let Some(token) = header("x-session-token") {
        return Some(token.to_string());
    }

    header("cookie")?
        .split(';')
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| *name == "session_token")
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_bearer_token() {
        let map = headers(&[("authorization", "Bearer abc123")]);
        assert_eq!(extract_session_token(&map).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_session_header_and_cookie() {
        let map = headers(&[("x-session-token", "tok")]);
        assert_eq!(extract_session_token(&map).as_deref(), Some("tok"));

        let map = headers(&[("cookie", "theme=dark; session_token=c00kie")]);
        assert_eq!(extract_session_token(&map).as_deref(), Some("c00kie"));
    }

    #[test]
    fn test_missing_or_malformed() {
        assert!(extract_session_token(&HeaderMap::new()).is_none());
        assert!(extract_session_token(&headers(&[("authorization", "Basic dXNlcg==")])).is_none());
        assert!(extract_session_token(&headers(&[("cookie", "theme=dark")])).is_none());
    }
}
