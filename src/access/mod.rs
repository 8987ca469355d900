//! Role-based and ownership-based access control.

/// Authorization middleware and gate
pub mod middleware;
/// Ownership checks per resource family
pub mod ownership;
/// Route permission table
pub mod permissions;
/// Route template matching
pub mod router;

pub use middleware::{AuthorizationGate, authorization_middleware};
pub use permissions::{PermissionRegistry, PermissionRule, RouteId};
