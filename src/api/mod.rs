//! HTTP API Handlers and Routes
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Session and system handlers
//! - [`api::routes`](crate::api::routes) - Router assembly and middleware wiring
//! - [`api::origins`](crate::api::origins) - Origin allow-list and CORS
//! - [`api::rate_limit`](crate::api::rate_limit) - Per-method request quotas
//!
//! # Endpoints
//!
//! - `POST /auth/refresh` - Exchange the `refresh_token` cookie for a new access token
//! - `POST /auth/logout` - Revoke the session's tokens and clear cookies
//! - `GET /health` - Health check
//!
//! Resource routes (`/jobs`, `/apply`, `/files`, `/users`) are mounted by
//! the embedding service and passed to
//! [`create_router`](routes::create_router), which places them behind the
//! authentication and authorization gates.
//!
//! # Authentication
//!
//! Protected endpoints accept the access token from the `access_token`
//! cookie or the `Authorization` header:
//! ```text
//! Authorization: Bearer <token>
//! ```

/// Request handlers.
pub mod handlers;
pub mod origins;
pub mod rate_limit;
/// Router configuration.
pub mod routes;
