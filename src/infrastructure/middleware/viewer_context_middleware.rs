// ViewerContext Middleware - resolves the bearer token and injects the viewer into request extensions

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    infrastructure::{security::TokenAuthenticator, viewer::ViewerContext},
};

/// Trait for application state that can resolve tokens
pub trait HasAuthenticator {
    fn authenticator(&self) -> &Arc<TokenAuthenticator>;
}

/// A missing header makes the request anonymous; a bad token is rejected outright.
pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    T: HasAuthenticator + Clone + Send + Sync + 'static,
{
    let request_id = format!("req-{}", Uuid::new_v4());

    let viewer_context = match extract_token(request.headers())? {
        Some(key) => match app_state.authenticator().authenticate(&key).await? {
            Some(user_id) => {
                debug!(%request_id, %user_id, "Authenticated request");
                ViewerContext::authenticated(user_id, request_id)
            }
            None => {
                warn!(%request_id, "Rejected unknown token");
                return Err(AppError::Unauthorized("Invalid token.".to_string()));
            }
        },
        None => ViewerContext::anonymous(request_id),
    };

    request.extensions_mut().insert(Arc::new(viewer_context));
    Ok(next.run(request).await)
}

/// Accepts `Bearer <key>` and `Token <key>`. Other schemes are ignored.
fn extract_token(headers: &HeaderMap) -> AppResult<Option<String>> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid token header.".to_string()))?;

    let mut parts = auth_str.split_whitespace();
    let scheme = parts.next().unwrap_or_default();
    if !scheme.eq_ignore_ascii_case("bearer") && !scheme.eq_ignore_ascii_case("token") {
        return Ok(None);
    }

    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(Some(key.to_string())),
        (None, _) => Err(AppError::Unauthorized(
            "Invalid token header. No credentials provided.".to_string(),
        )),
        (Some(_), Some(_)) => Err(AppError::Unauthorized(
            "Invalid token header. Token string should not contain spaces.".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_token(&headers("Bearer abc123")).unwrap(), Some("abc123".to_string()));
    }

    #[test]
    fn test_extract_token_scheme() {
        assert_eq!(extract_token(&headers("Token abc123")).unwrap(), Some("abc123".to_string()));
    }

    #[test]
    fn test_extract_anonymous() {
        assert_eq!(extract_token(&HeaderMap::new()).unwrap(), None);
        assert_eq!(extract_token(&headers("Basic dXNlcjpwYXNz")).unwrap(), None);
    }

    #[test]
    fn test_extract_malformed() {
        assert!(matches!(extract_token(&headers("Bearer")), Err(AppError::Unauthorized(_))));
        assert!(matches!(extract_token(&headers("Bearer a b")), Err(AppError::Unauthorized(_))));
    }
}
