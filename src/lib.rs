//! # jobgate - Authentication and Access Control for a Job Platform
//!
//! jobgate issues and verifies session tokens for a job platform and gates
//! every protected request on who the caller is, whether their account is
//! still in good standing, what their role permits, and whether they own
//! the resource they address.
//!
//! ## Overview
//!
//! jobgate can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `jobgate-server` binary
//! 2. **As a library** - Mount your resource routes behind its gates
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use jobgate::{AppState, GateConfig, api::routes::create_router, db::MemoryRepository};
//! use axum::{Router, routing::put};
//! use std::sync::Arc;
//!
//! let config = GateConfig::load("jobgate.toml")?;
//! let state = AppState::new(config, Arc::new(MemoryRepository::new()))?;
//! state.start_background_tasks();
//!
//! let protected = Router::new().route("/jobs/{id}", put(update_job));
//! let app = create_router(state, protected);
//! ```
//!
//! ## Request Pipeline
//!
//! 1. [`auth::middleware::auth_middleware`] reads the access token (cookie,
//!    then bearer header), verifies it, rejects revoked tokens and attaches a
//!    [`types::Principal`].
//! 2. [`access::authorization_middleware`] reloads the account, rejects it
//!    if banned, resolves the route in the permission table, checks the
//!    stored role and, where required, resource ownership.
//!
//! Every route, public or protected, first passes the origin allow-list and
//! the per-method rate limits ([`api::routes::with_request_gating`]).
//!
//! ## Modules
//!
//! - [`access`] - Permission table, route matching, ownership checks
//! - [`api`] - Session endpoints and router assembly
//! - [`auth`] - Tokens, revocation and authentication middleware
//! - [`db`] - Persistence boundary
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Role and ownership based authorization.
pub mod access;
/// HTTP API handlers and routes.
pub mod api;
/// JWT authentication and middleware.
pub mod auth;
/// Persistence boundary.
pub mod db;
/// Core types and errors.
pub mod types;
/// Configuration utilities.
pub mod utils;

pub use access::{AuthorizationGate, PermissionRegistry};
pub use api::rate_limit::MethodRateLimiter;
pub use auth::jwt::TokenService;
pub use auth::revocation::RevocationStore;
pub use db::Repository;
pub use types::{AppError, Result};
pub use utils::toml_config::GateConfig;

use std::sync::Arc;

/// Application state shared across handlers and middleware
#[derive(Clone)]
pub struct AppState {
    /// Validated TOML configuration
    pub config: Arc<GateConfig>,
    /// User, job, application and file lookups
    pub repository: Arc<dyn Repository>,
    /// Token issuance and verification
    pub tokens: Arc<TokenService>,
    /// Revoked tokens, shared with `tokens`
    pub revocations: Arc<RevocationStore>,
    /// Ban, role and ownership checks
    pub gate: Arc<AuthorizationGate>,
    /// Per-client request quotas
    pub rate_limits: Arc<MethodRateLimiter>,
}

impl AppState {
    /// Build state from configuration, reading the signing secret from the
    /// environment variable the config names.
    ///
    /// With authentication disabled the secret is optional; tokens cannot be
    /// issued without one.
    pub fn new(config: GateConfig, repository: Arc<dyn Repository>) -> Result<Self> {
        let secret = match config.jwt_secret() {
            Ok(secret) => secret,
            Err(_) if !config.auth.enabled => String::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::with_secret(config, repository, secret))
    }

    /// Build state with an explicit signing secret.
    pub fn with_secret(config: GateConfig, repository: Arc<dyn Repository>, jwt_secret: String) -> Self {
        let timeout = config.access.persistence_timeout();
        let revocations = Arc::new(RevocationStore::new());
        let tokens = Arc::new(TokenService::new(
            jwt_secret,
            config.auth.refresh_token_days,
            repository.clone(),
            revocations.clone(),
            timeout,
        ));
        let permissions = Arc::new(PermissionRegistry::with_defaults(config.access.unmatched_routes));
        let gate = Arc::new(AuthorizationGate::new(permissions, repository.clone(), timeout));
        let rate_limits = Arc::new(MethodRateLimiter::new(&config.rate_limit));

        Self {
            config: Arc::new(config),
            repository,
            tokens,
            revocations,
            gate,
            rate_limits,
        }
    }

    /// Start the revocation reaper and the rate limiter sweep. Safe to call
    /// more than once.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_background_tasks(&self) {
        let interval = self.config.auth.revocation_sweep_interval();
        if !self.revocations.start_reaper(interval) {
            return;
        }

        let limits = Arc::downgrade(&self.rate_limits);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limits) = limits.upgrade() else {
                    break;
                };
                limits.sweep();
                tracing::debug!(clients = limits.tracked_clients(), "rate limiter sweep");
            }
        });
    }
}
