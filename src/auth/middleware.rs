use crate::AppState;
use crate::types::{AppError, Principal, Result, Role};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
/// Cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Identity headers honoured only while authentication is disabled
pub const DEBUG_USER_ID_HEADER: &str = "x-user-id";
pub const DEBUG_USER_ROLE_HEADER: &str = "x-user-role";

/// Authenticates the request and attaches a [`Principal`].
///
/// The access token is read from the `access_token` cookie, falling back to
/// an `Authorization: Bearer` header. Revoked tokens are rejected even if
/// they still verify.
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response> {
    if !state.config.auth.enabled {
        if let Some(principal) = debug_principal(req.headers()) {
            req.extensions_mut().insert(principal);
        }
        return Ok(next.run(req).await);
    }

    let token = extract_token(req.headers()).ok_or(AppError::MissingCredentials)?;

    let claims = state.tokens.verify_access(&token)?;

    if state.revocations.is_revoked(&token) {
        tracing::info!(user_id = %claims.user_id, "revoked access token presented");
        return Err(AppError::TokenRevoked);
    }

    let principal = Principal::from_claims(&claims);
    tracing::debug!(user_id = %principal.user_id, role = %principal.role, "authenticated");
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Cookie first, then bearer header. Empty values count as absent.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Builds a principal from the debug identity headers. Requires both a
/// user id and a recognised role.
fn debug_principal(headers: &HeaderMap) -> Option<Principal> {
    let user_id = headers.get(DEBUG_USER_ID_HEADER)?.to_str().ok()?;
    let role: Role = headers.get(DEBUG_USER_ROLE_HEADER)?.to_str().ok()?.parse().ok()?;

    Some(Principal {
        user_id: user_id.to_string(),
        role,
        email: String::new(),
        name: String::new(),
        verified: false,
        banned: false,
    })
}

/// Extractor for the authenticated principal.
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Extension, Router, http::HeaderValue, routing::get};
    use axum_test::TestServer;

    async fn whoami(AuthUser(principal): AuthUser) -> String {
        principal.user_id
    }

    #[tokio::test]
    async fn test_auth_user_extractor() {
        let principal = Principal {
            user_id: "507f1f77bcf86cd799439011".to_string(),
            role: Role::Company,
            email: String::new(),
            name: String::new(),
            verified: true,
            banned: false,
        };

        let with_principal = Router::new()
            .route("/me", get(whoami))
            .layer(Extension(principal));
        let server = TestServer::new(with_principal).expect("Failed to create test server");
        let response = server.get("/me").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "507f1f77bcf86cd799439011");

        let without = TestServer::new(Router::new().route("/me", get(whoami))).expect("Failed to create test server");
        without.get("/me").await.assert_status_unauthorized();
    }

    #[test]
    fn test_cookie_preferred_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; access_token=from-cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));

        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_header_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("access_token="));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));

        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_malformed_header_is_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_token(&headers), None);

        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_debug_principal() {
        let mut headers = HeaderMap::new();
        headers.insert(DEBUG_USER_ID_HEADER, HeaderValue::from_static("507f1f77bcf86cd799439011"));
        headers.insert(DEBUG_USER_ROLE_HEADER, HeaderValue::from_static("faculty"));

        let principal = debug_principal(&headers).expect("should build principal");
        assert_eq!(principal.user_id, "507f1f77bcf86cd799439011");
        assert_eq!(principal.role, Role::Faculty);

        headers.insert(DEBUG_USER_ROLE_HEADER, HeaderValue::from_static("root"));
        assert!(debug_principal(&headers).is_none());
    }
}
