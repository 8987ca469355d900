use crate::AppState;
use crate::access::authorization_middleware;
use crate::api::handlers::{auth, system};
use crate::api::origins::{cors_layer, reject_unknown_origins};
use crate::api::rate_limit::rate_limit_middleware;
use crate::auth::middleware::auth_middleware;
use axum::{
    Router,
    http::{HeaderName, HeaderValue, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

/// Routes that never require a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
}

/// Wrap `routes` with authentication followed by authorization.
pub fn protect(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    routes.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .layer(middleware::from_fn_with_state(state.clone(), authorization_middleware)),
    )
}

/// Standard hardening headers, added only when a handler has not set them.
pub fn with_security_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let headers: [(HeaderName, &'static str); 5] = [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::STRICT_TRANSPORT_SECURITY, "max-age=31536000; includeSubDomains"),
        (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
        (
            HeaderName::from_static("permissions-policy"),
            "geolocation=(), microphone=(), camera=()",
        ),
    ];

    headers.into_iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ))
    })
}

/// Origin allow-list, CORS and per-method rate limits, applied to every
/// route. Origins are checked first, then quotas.
pub fn with_request_gating(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    let router = if state.config.rate_limit.enabled {
        router.layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
    } else {
        router
    };

    let router = match cors_layer(&state.config.access.allowed_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.layer(middleware::from_fn_with_state(state.clone(), reject_unknown_origins))
}

/// Build the full application: public routes, `protected` behind both
/// gates, request gating, security headers and request tracing.
pub fn create_router(state: AppState, protected: Router<AppState>) -> Router {
    let app = public_routes().merge(protect(protected, &state));
    let app = with_request_gating(app, &state);

    with_security_headers(app)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
