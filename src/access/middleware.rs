//! Authorization gate
//!
//! Runs after authentication. For each request it checks, in order:
//! bypass prefixes, presence of a principal, the account's live ban state,
//! the route's allowed roles, and resource ownership. The first failing
//! check decides the response.
//!
//! Role and ban state are read from the store on every request; the token's
//! copies of them only identify the caller.

use super::ownership::{OwnershipResolver, ResourceRef};
use super::permissions::{PermissionRegistry, is_bypassed};
use crate::AppState;
use crate::db::{Repository, with_timeout};
use crate::types::{AppError, Principal, Result, User};
use crate::utils::toml_config::UnmatchedRoutePolicy;
use axum::{
    extract::{Query, Request, State},
    http::{Method, Uri},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub struct AuthorizationGate {
    permissions: Arc<PermissionRegistry>,
    ownership: OwnershipResolver,
    repository: Arc<dyn Repository>,
    timeout: Duration,
}

impl AuthorizationGate {
    pub fn new(permissions: Arc<PermissionRegistry>, repository: Arc<dyn Repository>, timeout: Duration) -> Self {
        Self {
            permissions,
            ownership: OwnershipResolver::new(repository.clone(), timeout),
            repository,
            timeout,
        }
    }

    pub fn permissions(&self) -> &PermissionRegistry {
        &self.permissions
    }

    /// Decide whether `principal` may perform `method` on `uri`. On success
    /// returns the principal with role and account flags from the store.
    ///
    /// Bypassed paths are not handled here; callers check
    /// [`is_bypassed`] first.
    pub async fn authorize(&self, principal: &Principal, method: &Method, uri: &Uri) -> Result<Principal> {
        let account = self.check_ban(principal).await?;
        if account.role != principal.role {
            tracing::info!(
                user_id = %account.id,
                token_role = %principal.role,
                stored_role = %account.role,
                "role changed since token issue"
            );
        }
        let current = Principal {
            role: account.role,
            verified: account.verified,
            banned: account.banned,
            ..principal.clone()
        };
        let principal = &current;

        let Some(matched) = self.permissions.resolve(method, uri.path()) else {
            return match self.permissions.unmatched_policy() {
                UnmatchedRoutePolicy::Allow => {
                    tracing::debug!(%method, path = uri.path(), "route not in permission table; allowing");
                    Ok(current)
                }
                UnmatchedRoutePolicy::Deny => {
                    tracing::warn!(%method, path = uri.path(), "route not in permission table; denying");
                    Err(AppError::InsufficientPermissions)
                }
            };
        };

        if !matched.rule.allows(principal.role) {
            tracing::warn!(
                user_id = %principal.user_id,
                role = %principal.role,
                route = matched.template,
                "role not permitted"
            );
            return Err(AppError::InsufficientPermissions);
        }

        if matched.rule.require_ownership && !principal.role.is_admin() {
            let query_id = query_param(uri, "id");
            let target = ResourceRef {
                params: &matched.params,
                query_id: query_id.as_deref(),
            };

            if let Err(err) = self.ownership.check(principal, matched.rule.route, target).await {
                tracing::warn!(
                    user_id = %principal.user_id,
                    route = matched.template,
                    code = err.code(),
                    "ownership check failed"
                );
                return Err(err);
            }
        }

        Ok(current)
    }

    /// Load the caller's current record and reject it if banned right now,
    /// regardless of what the token says.
    async fn check_ban(&self, principal: &Principal) -> Result<User> {
        let user_id = principal
            .object_id()
            .map_err(|_| AppError::InvalidOrExpiredToken)?;

        let user = with_timeout(self.timeout, "ban check", self.repository.find_user(&user_id))
            .await?
            .ok_or(AppError::UnknownAccount)?;

        if user.banned {
            tracing::warn!(user_id = %user.id, "request from banned account");
            return Err(AppError::AccountBanned);
        }
        Ok(user)
    }
}

fn query_param(uri: &Uri, name: &str) -> Option<String> {
    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params.remove(name).filter(|v| !v.is_empty())
}

/// Axum middleware wrapping [`AuthorizationGate::authorize`].
pub async fn authorization_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    if !state.config.auth.enabled || is_bypassed(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let principal = req
        .extensions()
        .get::<Principal>()
        .cloned()
        .ok_or(AppError::MissingCredentials)?;

    let current = state
        .gate
        .authorize(&principal, req.method(), req.uri())
        .await?;
    req.extensions_mut().insert(current);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRepository;
    use crate::types::{Job, ObjectId, Role};

    fn user(role: Role) -> User {
        User {
            id: ObjectId::new(),
            email: "someone@example.com".to_string(),
            name: "Someone".to_string(),
            avatar_url: String::new(),
            role,
            verified: false,
            banned: false,
        }
    }

    fn principal(user: &User) -> Principal {
        Principal {
            user_id: user.id.to_hex(),
            role: user.role,
            email: user.email.clone(),
            name: user.name.clone(),
            verified: user.verified,
            banned: false,
        }
    }

    fn gate(repo: &Arc<MemoryRepository>, policy: UnmatchedRoutePolicy) -> AuthorizationGate {
        AuthorizationGate::new(
            Arc::new(PermissionRegistry::with_defaults(policy)),
            repo.clone(),
            Duration::from_secs(3),
        )
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_role_denied() {
        let repo = Arc::new(MemoryRepository::new());
        let seeker = user(Role::JobSeeker);
        repo.put_user(seeker.clone());

        let result = gate(&repo, UnmatchedRoutePolicy::Allow)
            .authorize(&principal(&seeker), &Method::POST, &uri("/jobs"))
            .await;
        assert!(matches!(result, Err(AppError::InsufficientPermissions)));
    }

    #[tokio::test]
    async fn test_ban_overrides_token_snapshot() {
        let repo = Arc::new(MemoryRepository::new());
        let mut company = user(Role::Company);
        company.banned = true;
        repo.put_user(company.clone());

        // The principal claims banned = false; the store wins.
        let result = gate(&repo, UnmatchedRoutePolicy::Allow)
            .authorize(&principal(&company), &Method::GET, &uri("/jobs"))
            .await;
        assert!(matches!(result, Err(AppError::AccountBanned)));
    }

    #[tokio::test]
    async fn test_role_read_from_store() {
        let repo = Arc::new(MemoryRepository::new());
        let admin = user(Role::Admin);
        repo.put_user(admin.clone());
        let stale = principal(&admin);
        repo.set_role(&admin.id, Role::JobSeeker);

        let gate = gate(&repo, UnmatchedRoutePolicy::Allow);
        assert!(matches!(
            gate.authorize(&stale, &Method::GET, &uri("/users")).await,
            Err(AppError::InsufficientPermissions)
        ));
        let current = gate
            .authorize(&stale, &Method::GET, &uri("/jobs"))
            .await
            .expect("job listing is open to every role");
        assert_eq!(current.role, Role::JobSeeker);

        // Ownership no longer short-circuits for the old admin role either.
        let other = user(Role::JobSeeker);
        repo.put_user(other.clone());
        assert!(matches!(
            gate.authorize(&stale, &Method::PUT, &uri(&format!("/users/{}", other.id)))
                .await,
            Err(AppError::NotResourceOwner)
        ));
    }

    #[tokio::test]
    async fn test_promotion_takes_effect_immediately() {
        let repo = Arc::new(MemoryRepository::new());
        let seeker = user(Role::JobSeeker);
        repo.put_user(seeker.clone());
        let stale = principal(&seeker);
        repo.set_role(&seeker.id, Role::Company);

        assert!(
            gate(&repo, UnmatchedRoutePolicy::Allow)
                .authorize(&stale, &Method::POST, &uri("/jobs"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_deleted_account() {
        let repo = Arc::new(MemoryRepository::new());
        let ghost = user(Role::Company);

        let result = gate(&repo, UnmatchedRoutePolicy::Allow)
            .authorize(&principal(&ghost), &Method::GET, &uri("/jobs"))
            .await;
        assert!(matches!(result, Err(AppError::UnknownAccount)));
    }

    #[tokio::test]
    async fn test_ownership_enforced_after_role() {
        let repo = Arc::new(MemoryRepository::new());
        let owner = user(Role::Company);
        let rival = user(Role::Company);
        repo.put_user(owner.clone());
        repo.put_user(rival.clone());
        let job = Job {
            id: ObjectId::new(),
            company_id: owner.id,
        };
        repo.put_job(job.clone());

        let gate = gate(&repo, UnmatchedRoutePolicy::Allow);
        let path = uri(&format!("/jobs/{}", job.id));

        assert!(gate.authorize(&principal(&owner), &Method::PUT, &path).await.is_ok());
        assert!(matches!(
            gate.authorize(&principal(&rival), &Method::PUT, &path).await,
            Err(AppError::NotResourceOwner)
        ));
    }

    #[tokio::test]
    async fn test_query_id_for_profile_lookup() {
        let repo = Arc::new(MemoryRepository::new());
        let seeker = user(Role::JobSeeker);
        let company = user(Role::Company);
        repo.put_user(seeker.clone());
        repo.put_user(company.clone());

        let gate = gate(&repo, UnmatchedRoutePolicy::Allow);
        let path = uri(&format!("/users/query?id={}", company.id));
        assert!(gate.authorize(&principal(&seeker), &Method::GET, &path).await.is_ok());
    }

    #[tokio::test]
    async fn test_unmatched_policy() {
        let repo = Arc::new(MemoryRepository::new());
        let faculty = user(Role::Faculty);
        repo.put_user(faculty.clone());
        let path = uri("/reports/weekly");

        assert!(
            gate(&repo, UnmatchedRoutePolicy::Allow)
                .authorize(&principal(&faculty), &Method::GET, &path)
                .await
                .is_ok()
        );
        assert!(matches!(
            gate(&repo, UnmatchedRoutePolicy::Deny)
                .authorize(&principal(&faculty), &Method::GET, &path)
                .await,
            Err(AppError::InsufficientPermissions)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ban_check_timeout() {
        let repo = Arc::new(MemoryRepository::new());
        let admin = user(Role::Admin);
        repo.put_user(admin.clone());
        repo.set_latency(Some(Duration::from_secs(5)));

        let result = gate(&repo, UnmatchedRoutePolicy::Allow)
            .authorize(&principal(&admin), &Method::GET, &uri("/users"))
            .await;
        assert!(matches!(result, Err(AppError::PersistenceTimeout(_))));
    }

    #[test]
    fn test_query_param() {
        assert_eq!(query_param(&uri("/users/query?id=abc&x=1"), "id").as_deref(), Some("abc"));
        assert_eq!(query_param(&uri("/users/query?id="), "id"), None);
        assert_eq!(query_param(&uri("/users/query"), "id"), None);
    }
}
