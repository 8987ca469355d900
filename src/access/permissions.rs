//! Route permission table
//!
//! Every protected route is named by a [`RouteId`] and carries a
//! [`PermissionRule`]: the roles allowed to call it and whether the caller
//! must also own the addressed resource. The table is declarative and is
//! the single place access rules are changed.

use super::router::{PathParams, RouteMatcher};
use crate::types::Role;
use crate::utils::toml_config::UnmatchedRoutePolicy;
use axum::http::Method;
use std::collections::HashMap;

/// Path prefixes that never pass through authorization. An entry without a
/// trailing slash covers that exact path and anything below it.
pub const BYPASS_PREFIXES: &[&str] = &[
    "/auth/",
    "/health",
    "/swagger/",
    "/docs",
    "/jobs/public/",
    "/users/public/",
];

pub fn is_bypassed(path: &str) -> bool {
    BYPASS_PREFIXES.iter().any(|prefix| match path.strip_prefix(prefix) {
        Some(rest) => prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/'),
        None => false,
    })
}

/// Resource family a route operates on; selects the ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Job,
    Application,
    File,
    User,
}

/// Every protected route known to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteId {
    JobCreate,
    JobList,
    JobQuery,
    JobGet,
    JobUpdate,
    JobDelete,
    ApplicationCreate,
    ApplicationList,
    ApplicationQuery,
    ApplicationGet,
    ApplicationUpdate,
    ApplicationDelete,
    FileUpload,
    FileDownload,
    FileListByUser,
    FileDelete,
    ApplicationFiles,
    ApplicationFileDownload,
    UserList,
    UserCreate,
    UserDelete,
    UserQuery,
    UserGet,
    UserUpdate,
}

impl RouteId {
    pub fn method(&self) -> Method {
        use RouteId::*;
        match self {
            JobCreate | ApplicationCreate | FileUpload | UserCreate => Method::POST,
            JobUpdate | ApplicationUpdate | UserUpdate => Method::PUT,
            JobDelete | ApplicationDelete | FileDelete | UserDelete => Method::DELETE,
            JobList | JobQuery | JobGet | ApplicationList | ApplicationQuery | ApplicationGet
            | FileDownload | FileListByUser | ApplicationFiles | ApplicationFileDownload
            | UserList | UserQuery | UserGet => Method::GET,
        }
    }

    pub fn template(&self) -> &'static str {
        use RouteId::*;
        match self {
            JobCreate | JobList => "/jobs",
            JobQuery => "/jobs/query",
            JobGet | JobUpdate | JobDelete => "/jobs/:id",
            ApplicationCreate | ApplicationList => "/apply",
            ApplicationQuery => "/apply/query",
            ApplicationGet | ApplicationUpdate | ApplicationDelete => "/apply/:id",
            FileUpload => "/files/upload",
            FileDownload => "/files/download/:id",
            FileListByUser => "/files/user/:userId",
            FileDelete => "/files/:id",
            ApplicationFiles => "/files/application/:applicationId",
            ApplicationFileDownload => "/files/application/:applicationId/download/:fileId",
            UserList | UserCreate => "/users",
            UserQuery => "/users/query",
            UserGet | UserUpdate | UserDelete => "/users/:id",
        }
    }

    pub fn resource(&self) -> ResourceKind {
        use RouteId::*;
        match self {
            JobCreate | JobList | JobQuery | JobGet | JobUpdate | JobDelete => ResourceKind::Job,
            ApplicationCreate | ApplicationList | ApplicationQuery | ApplicationGet
            | ApplicationUpdate | ApplicationDelete => ResourceKind::Application,
            FileUpload | FileDownload | FileListByUser | FileDelete | ApplicationFiles
            | ApplicationFileDownload => ResourceKind::File,
            UserList | UserCreate | UserDelete | UserQuery | UserGet | UserUpdate => {
                ResourceKind::User
            }
        }
    }
}

const EVERYONE: &[Role] = &[Role::JobSeeker, Role::Company, Role::Faculty, Role::Admin];
const COMPANY: &[Role] = &[Role::Company, Role::Admin];
const SEEKER: &[Role] = &[Role::JobSeeker, Role::Admin];
const SEEKER_COMPANY: &[Role] = &[Role::JobSeeker, Role::Company, Role::Admin];
const ADMIN: &[Role] = &[Role::Admin];

/// Roles allowed on a route and whether ownership is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionRule {
    pub route: RouteId,
    pub allowed_roles: &'static [Role],
    pub require_ownership: bool,
}

impl PermissionRule {
    pub const fn new(route: RouteId, allowed_roles: &'static [Role], require_ownership: bool) -> Self {
        Self {
            route,
            allowed_roles,
            require_ownership,
        }
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }
}

/// The platform's route table.
pub const DEFAULT_RULES: &[PermissionRule] = &[
    // Jobs
    PermissionRule::new(RouteId::JobCreate, COMPANY, false),
    PermissionRule::new(RouteId::JobList, EVERYONE, false),
    PermissionRule::new(RouteId::JobQuery, EVERYONE, false),
    PermissionRule::new(RouteId::JobGet, EVERYONE, false),
    PermissionRule::new(RouteId::JobUpdate, COMPANY, true),
    PermissionRule::new(RouteId::JobDelete, COMPANY, true),
    // Applications
    PermissionRule::new(RouteId::ApplicationCreate, SEEKER, false),
    PermissionRule::new(RouteId::ApplicationList, SEEKER_COMPANY, false),
    PermissionRule::new(RouteId::ApplicationQuery, SEEKER_COMPANY, false),
    PermissionRule::new(RouteId::ApplicationGet, SEEKER_COMPANY, true),
    PermissionRule::new(RouteId::ApplicationUpdate, COMPANY, false),
    PermissionRule::new(RouteId::ApplicationDelete, SEEKER, true),
    // Files
    PermissionRule::new(RouteId::FileUpload, SEEKER_COMPANY, false),
    PermissionRule::new(RouteId::FileDownload, SEEKER_COMPANY, true),
    PermissionRule::new(RouteId::FileListByUser, SEEKER_COMPANY, true),
    PermissionRule::new(RouteId::FileDelete, SEEKER_COMPANY, true),
    PermissionRule::new(RouteId::ApplicationFiles, COMPANY, true),
    PermissionRule::new(RouteId::ApplicationFileDownload, COMPANY, true),
    // Users
    PermissionRule::new(RouteId::UserList, ADMIN, false),
    PermissionRule::new(RouteId::UserCreate, ADMIN, false),
    PermissionRule::new(RouteId::UserDelete, ADMIN, false),
    PermissionRule::new(RouteId::UserQuery, EVERYONE, true),
    PermissionRule::new(RouteId::UserGet, EVERYONE, true),
    PermissionRule::new(RouteId::UserUpdate, EVERYONE, true),
];

/// A request resolved to its rule.
#[derive(Debug, Clone)]
pub struct MatchedRule<'a> {
    pub rule: &'a PermissionRule,
    pub template: &'static str,
    pub params: PathParams,
}

/// Lookup from `(method, path)` to [`PermissionRule`].
pub struct PermissionRegistry {
    rules: HashMap<RouteId, PermissionRule>,
    matcher: RouteMatcher<RouteId>,
    unmatched: UnmatchedRoutePolicy,
}

impl PermissionRegistry {
    /// Build a registry from rules. A later rule for the same route replaces
    /// an earlier one.
    pub fn new(rules: impl IntoIterator<Item = PermissionRule>, unmatched: UnmatchedRoutePolicy) -> Self {
        let mut by_route = HashMap::new();
        let mut matcher = RouteMatcher::new();

        for rule in rules {
            if by_route.insert(rule.route, rule).is_none() {
                matcher.insert(rule.route.method(), rule.route.template(), rule.route);
            }
        }

        Self {
            rules: by_route,
            matcher,
            unmatched,
        }
    }

    pub fn with_defaults(unmatched: UnmatchedRoutePolicy) -> Self {
        Self::new(DEFAULT_RULES.iter().copied(), unmatched)
    }

    pub fn unmatched_policy(&self) -> UnmatchedRoutePolicy {
        self.unmatched
    }

    pub fn rule(&self, route: RouteId) -> Option<&PermissionRule> {
        self.rules.get(&route)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve a request to its rule. `None` means the route is not listed.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<MatchedRule<'_>> {
        let matched = self.matcher.resolve(method, path)?;
        let rule = self.rules.get(&matched.key)?;

        Some(MatchedRule {
            rule,
            template: matched.template,
            params: matched.params,
        })
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::with_defaults(UnmatchedRoutePolicy::default())
    }
}
