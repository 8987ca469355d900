//! Browser origin allow-list
//!
//! Requests without an `Origin` header (curl, server-to-server) pass. Any
//! other origin must be listed in `access.allowed_origins`.

use crate::AppState;
use crate::types::{AppError, Result};
use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::Next,
    response::Response,
};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// CORS layer for the configured origins. Credentials are allowed so the
/// session cookies travel with cross-origin calls. `None` when no origins
/// are configured.
pub fn cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600)),
    )
}

pub fn is_allowed_origin(allowed_origins: &[String], origin: Option<&HeaderValue>) -> bool {
    match origin {
        None => true,
        Some(origin) => allowed_origins
            .iter()
            .any(|allowed| origin.as_bytes() == allowed.as_bytes()),
    }
}

/// Refuse requests from origins outside the allow-list with 403.
pub async fn reject_unknown_origins(State(state): State<AppState>, req: Request, next: Next) -> Result<Response> {
    let allowed = &state.config.access.allowed_origins;
    if allowed.is_empty() {
        return Ok(next.run(req).await);
    }

    let origin = req.headers().get(header::ORIGIN);
    if !is_allowed_origin(allowed, origin) {
        tracing::warn!(origin = ?origin, path = req.uri().path(), "request from unknown origin");
        return Err(AppError::ForbiddenOrigin);
    }

    Ok(next.run(req).await)
}
