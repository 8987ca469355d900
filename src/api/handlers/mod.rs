//! API request handlers.

/// Session handlers (refresh, logout) and cookie helpers.
pub mod auth;
/// Health check and principal echo.
pub mod system;
