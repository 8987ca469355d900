//! JWT Authentication and Middleware
//!
//! This module issues and verifies the platform's session tokens and
//! authenticates incoming requests.
//!
//! # Module Structure
//!
//! - [`auth::jwt`](crate::auth::jwt) - Token issuance, refresh, verification and invalidation
//! - [`auth::revocation`](crate::auth::revocation) - In-memory revocation list with a background reaper
//! - [`auth::middleware`](crate::auth::middleware) - Axum middleware and the [`AuthUser`](middleware::AuthUser) extractor
//!
//! # Tokens
//!
//! - **Access tokens** are HS256 JWTs valid for 15 minutes, carried in the
//!   `access_token` cookie or an `Authorization: Bearer` header.
//! - **Refresh tokens** share the claim layout, carry `"type": "refresh"`,
//!   live for `auth.refresh_token_days` and are only accepted by
//!   `POST /auth/refresh`.
//!
//! Role, ban and verification claims are copied from the user record at
//! issuance. They are a snapshot: the authorization gate re-reads ban state
//! on every request.
//!
//! # Extracting the Principal in Handlers
//!
//! ```ignore
//! use jobgate::auth::middleware::AuthUser;
//!
//! async fn whoami(AuthUser(principal): AuthUser) -> String {
//!     format!("{} ({})", principal.user_id, principal.role)
//! }
//! ```
//!
//! # Configuration
//!
//! Configure via `jobgate.toml`:
//! ```toml
//! [auth]
//! jwt_secret_env = "JWT_SECRET"   # Name of the env var holding the secret
//! refresh_token_days = 7
//! secure_cookies = true
//! ```

/// Token issuance, refresh and verification.
pub mod jwt;
/// Authentication middleware and extractors for protected routes.
pub mod middleware;
/// Revoked-token store.
pub mod revocation;
