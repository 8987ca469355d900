//! Resource ownership checks
//!
//! Each resource family has its own notion of "owns": a company owns its
//! jobs, a job seeker owns their applications, a company owns the
//! applications submitted to its jobs, an uploader owns their files, and a
//! user owns their profile. Profile reads by other users are governed by
//! [`can_view_profile`].
//!
//! Every persistence call is bounded by the configured timeout.

use super::permissions::RouteId;
use super::router::PathParams;
use crate::db::{Repository, with_timeout};
use crate::types::{AppError, JobApplication, ObjectId, Principal, Result, Role};
use std::sync::Arc;
use std::time::Duration;

/// Which target roles a viewer may read profiles of, indexed
/// `[viewer][target]` in [`Role::ALL`] order.
#[rustfmt::skip]
const PROFILE_VISIBILITY: [[bool; 4]; 4] = [
    //              jobSeeker  company  faculty  admin
    /* jobSeeker */ [false,    true,    false,   false],
    /* company   */ [true,     true,    false,   false],
    /* faculty   */ [false,    true,    false,   false],
    /* admin     */ [true,     true,    true,    true],
];

fn role_index(role: Role) -> usize {
    match role {
        Role::JobSeeker => 0,
        Role::Company => 1,
        Role::Faculty => 2,
        Role::Admin => 3,
    }
}

/// Whether `viewer` may read the profile of a user whose role is `target`.
pub fn can_view_profile(viewer: Role, target: Role) -> bool {
    PROFILE_VISIBILITY[role_index(viewer)][role_index(target)]
}

/// Where the resource identifier for a request was found.
#[derive(Debug, Clone, Copy)]
pub struct ResourceRef<'a> {
    pub params: &'a PathParams,
    /// The `id` query parameter, for `/users/query`
    pub query_id: Option<&'a str>,
}

pub struct OwnershipResolver {
    repository: Arc<dyn Repository>,
    timeout: Duration,
}

impl OwnershipResolver {
    pub fn new(repository: Arc<dyn Repository>, timeout: Duration) -> Self {
        Self {
            repository,
            timeout,
        }
    }

    /// Succeeds if `principal` owns (or for profile reads, may view) the
    /// resource addressed by `route`. Admins always pass.
    pub async fn check(&self, principal: &Principal, route: RouteId, target: ResourceRef<'_>) -> Result<()> {
        if principal.role.is_admin() {
            return Ok(());
        }

        use RouteId::*;
        match route {
            JobUpdate | JobDelete => {
                let job_id = required(target.params, "id")?;
                self.check_job(principal, job_id).await
            }
            ApplicationGet | ApplicationDelete => {
                let application_id = required(target.params, "id")?;
                self.check_application(principal, application_id).await.map(|_| ())
            }
            ApplicationFiles => {
                let application_id = required(target.params, "applicationId")?;
                self.check_application(principal, application_id).await.map(|_| ())
            }
            ApplicationFileDownload => {
                let application_id = required(target.params, "applicationId")?;
                let file_id = required(target.params, "fileId")?;
                let application = self.check_application(principal, application_id).await?;
                self.check_application_file(&application, file_id).await
            }
            FileDownload | FileDelete => {
                let file_id = required(target.params, "id")?;
                self.check_file(principal, file_id).await
            }
            FileListByUser => {
                let user_id = ObjectId::parse_str(required(target.params, "userId")?)?;
                if user_id == principal_id(principal)? {
                    Ok(())
                } else {
                    Err(AppError::NotResourceOwner)
                }
            }
            UserGet | UserQuery => {
                let user_id = match route {
                    UserQuery => target.query_id.ok_or(AppError::NotResourceOwner)?,
                    _ => required(target.params, "id")?,
                };
                self.check_profile_read(principal, user_id).await
            }
            UserUpdate => {
                let user_id = ObjectId::parse_str(required(target.params, "id")?)?;
                if user_id == principal_id(principal)? {
                    Ok(())
                } else {
                    Err(AppError::NotResourceOwner)
                }
            }
            other => {
                tracing::warn!(route = ?other, "ownership required but no check defined; denying");
                Err(AppError::NotResourceOwner)
            }
        }
    }

    async fn check_job(&self, principal: &Principal, job_id: &str) -> Result<()> {
        let job_id = ObjectId::parse_str(job_id)?;
        let job = with_timeout(self.timeout, "job lookup", self.repository.find_job(&job_id))
            .await?
            .ok_or(AppError::ResourceNotFound)?;

        if job.company_id == principal_id(principal)? {
            Ok(())
        } else {
            Err(AppError::NotResourceOwner)
        }
    }

    /// Job seekers own applications they submitted; companies own
    /// applications to their jobs. Nobody else owns one.
    async fn check_application(&self, principal: &Principal, application_id: &str) -> Result<JobApplication> {
        let application_id = ObjectId::parse_str(application_id)?;
        let application = with_timeout(
            self.timeout,
            "application lookup",
            self.repository.find_application(&application_id),
        )
        .await?
        .ok_or(AppError::ResourceNotFound)?;

        let me = principal_id(principal)?;
        let owned = match principal.role {
            Role::JobSeeker => application.applicant_id == me,
            Role::Company => {
                let job = with_timeout(
                    self.timeout,
                    "job lookup",
                    self.repository.find_job(&application.job_id),
                )
                .await?
                .ok_or(AppError::ResourceNotFound)?;
                job.company_id == me
            }
            Role::Faculty | Role::Admin => false,
        };

        if owned {
            Ok(application)
        } else {
            Err(AppError::NotResourceOwner)
        }
    }

    /// A file is reachable through an application only if the applicant
    /// uploaded it.
    async fn check_application_file(&self, application: &JobApplication, file_id: &str) -> Result<()> {
        let file_id = ObjectId::parse_str(file_id)?;
        let file = with_timeout(self.timeout, "file lookup", self.repository.find_file(&file_id))
            .await?
            .ok_or(AppError::ResourceNotFound)?;

        if file.user_id == application.applicant_id {
            Ok(())
        } else {
            Err(AppError::NotResourceOwner)
        }
    }

    async fn check_file(&self, principal: &Principal, file_id: &str) -> Result<()> {
        let file_id = ObjectId::parse_str(file_id)?;
        let file = with_timeout(self.timeout, "file lookup", self.repository.find_file(&file_id))
            .await?
            .ok_or(AppError::ResourceNotFound)?;

        if file.user_id == principal_id(principal)? {
            Ok(())
        } else {
            Err(AppError::NotResourceOwner)
        }
    }

    async fn check_profile_read(&self, principal: &Principal, user_id: &str) -> Result<()> {
        if user_id == principal.user_id {
            return Ok(());
        }

        let user_id = ObjectId::parse_str(user_id)?;
        let target = with_timeout(self.timeout, "user lookup", self.repository.find_user(&user_id))
            .await?
            .ok_or(AppError::ResourceNotFound)?;

        if can_view_profile(principal.role, target.role) {
            Ok(())
        } else {
            Err(AppError::NotResourceOwner)
        }
    }
}

fn required<'a>(params: &'a PathParams, name: &str) -> Result<&'a str> {
    params.get(name).ok_or(AppError::InvalidResourceId)
}

fn principal_id(principal: &Principal) -> Result<ObjectId> {
    principal.object_id().map_err(|_| AppError::NotResourceOwner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::permissions::PermissionRegistry;
    use crate::db::MemoryRepository;
    use crate::types::{FileRecord, Job, User};
    use axum::http::Method;
    use rstest::rstest;

    #[rstest]
    #[case(Role::JobSeeker, Role::Company, true)]
    #[case(Role::JobSeeker, Role::JobSeeker, false)]
    #[case(Role::JobSeeker, Role::Faculty, false)]
    #[case(Role::Company, Role::JobSeeker, true)]
    #[case(Role::Company, Role::Company, true)]
    #[case(Role::Company, Role::Admin, false)]
    #[case(Role::Faculty, Role::Company, true)]
    #[case(Role::Faculty, Role::JobSeeker, false)]
    #[case(Role::Admin, Role::Faculty, true)]
    #[case(Role::Admin, Role::Admin, true)]
    fn test_profile_visibility(#[case] viewer: Role, #[case] target: Role, #[case] visible: bool) {
        assert_eq!(can_view_profile(viewer, target), visible);
    }

    struct World {
        repo: Arc<MemoryRepository>,
        resolver: OwnershipResolver,
        seeker: User,
        other_seeker: User,
        company: User,
        other_company: User,
        faculty: User,
        job: Job,
        application: JobApplication,
        resume: FileRecord,
    }

    fn user(role: Role) -> User {
        User {
            id: ObjectId::new(),
            email: format!("{role}@example.com"),
            name: role.to_string(),
            avatar_url: String::new(),
            role,
            verified: true,
            banned: false,
        }
    }

    fn world() -> World {
        let repo = Arc::new(MemoryRepository::new());
        let seeker = user(Role::JobSeeker);
        let other_seeker = user(Role::JobSeeker);
        let company = user(Role::Company);
        let other_company = user(Role::Company);
        let faculty = user(Role::Faculty);
        for u in [&seeker, &other_seeker, &company, &other_company, &faculty] {
            repo.put_user(u.clone());
        }

        let job = Job {
            id: ObjectId::new(),
            company_id: company.id,
        };
        let application = JobApplication {
            id: ObjectId::new(),
            job_id: job.id,
            applicant_id: seeker.id,
        };
        let resume = FileRecord {
            id: ObjectId::new(),
            user_id: seeker.id,
        };
        repo.put_job(job.clone());
        repo.put_application(application.clone());
        repo.put_file(resume.clone());

        let resolver = OwnershipResolver::new(repo.clone(), Duration::from_secs(3));
        World {
            repo,
            resolver,
            seeker,
            other_seeker,
            company,
            other_company,
            faculty,
            job,
            application,
            resume,
        }
    }

    fn principal(user: &User) -> Principal {
        Principal {
            user_id: user.id.to_hex(),
            role: user.role,
            email: user.email.clone(),
            name: user.name.clone(),
            verified: user.verified,
            banned: user.banned,
        }
    }

    async fn check(w: &World, who: &User, method: Method, path: &str, query_id: Option<&str>) -> Result<()> {
        let registry = PermissionRegistry::default();
        let matched = registry.resolve(&method, path).expect("route should resolve");
        w.resolver
            .check(
                &principal(who),
                matched.rule.route,
                ResourceRef {
                    params: &matched.params,
                    query_id,
                },
            )
            .await
    }

    #[tokio::test]
    async fn test_company_owns_its_job() {
        let w = world();
        let path = format!("/jobs/{}", w.job.id);

        assert!(check(&w, &w.company, Method::PUT, &path, None).await.is_ok());
        assert!(matches!(
            check(&w, &w.other_company, Method::PUT, &path, None).await,
            Err(AppError::NotResourceOwner)
        ));
    }

    #[tokio::test]
    async fn test_job_lookup_failures() {
        let w = world();

        assert!(matches!(
            check(&w, &w.company, Method::DELETE, "/jobs/not-an-id", None).await,
            Err(AppError::InvalidResourceId)
        ));
        assert!(matches!(
            check(&w, &w.company, Method::DELETE, &format!("/jobs/{}", ObjectId::new()), None).await,
            Err(AppError::ResourceNotFound)
        ));
    }

    #[tokio::test]
    async fn test_application_owners() {
        let w = world();
        let path = format!("/apply/{}", w.application.id);

        assert!(check(&w, &w.seeker, Method::GET, &path, None).await.is_ok());
        assert!(check(&w, &w.company, Method::GET, &path, None).await.is_ok());
        assert!(matches!(
            check(&w, &w.other_seeker, Method::GET, &path, None).await,
            Err(AppError::NotResourceOwner)
        ));
        assert!(matches!(
            check(&w, &w.other_company, Method::GET, &path, None).await,
            Err(AppError::NotResourceOwner)
        ));
        assert!(matches!(
            check(&w, &w.faculty, Method::GET, &path, None).await,
            Err(AppError::NotResourceOwner)
        ));
    }

    #[tokio::test]
    async fn test_application_with_missing_job() {
        let w = world();
        let orphan = JobApplication {
            id: ObjectId::new(),
            job_id: ObjectId::new(),
            applicant_id: w.seeker.id,
        };
        w.repo.put_application(orphan.clone());

        assert!(matches!(
            check(&w, &w.company, Method::GET, &format!("/apply/{}", orphan.id), None).await,
            Err(AppError::ResourceNotFound)
        ));
    }

    #[tokio::test]
    async fn test_file_owner() {
        let w = world();
        let path = format!("/files/download/{}", w.resume.id);

        assert!(check(&w, &w.seeker, Method::GET, &path, None).await.is_ok());
        assert!(matches!(
            check(&w, &w.company, Method::GET, &path, None).await,
            Err(AppError::NotResourceOwner)
        ));
    }

    #[tokio::test]
    async fn test_files_by_user() {
        let w = world();

        let own = format!("/files/user/{}", w.seeker.id);
        assert!(check(&w, &w.seeker, Method::GET, &own, None).await.is_ok());

        let other = format!("/files/user/{}", w.other_seeker.id);
        assert!(matches!(
            check(&w, &w.seeker, Method::GET, &other, None).await,
            Err(AppError::NotResourceOwner)
        ));
    }

    #[tokio::test]
    async fn test_application_file_download() {
        let w = world();
        let path = format!("/files/application/{}/download/{}", w.application.id, w.resume.id);
        assert!(check(&w, &w.company, Method::GET, &path, None).await.is_ok());

        let stray = FileRecord {
            id: ObjectId::new(),
            user_id: w.other_seeker.id,
        };
        w.repo.put_file(stray.clone());
        let path = format!("/files/application/{}/download/{}", w.application.id, stray.id);
        assert!(matches!(
            check(&w, &w.company, Method::GET, &path, None).await,
            Err(AppError::NotResourceOwner)
        ));
    }

    #[tokio::test]
    async fn test_profile_reads() {
        let w = world();

        // Own profile, no lookup needed.
        let own = format!("/users/{}", w.seeker.id);
        assert!(check(&w, &w.seeker, Method::GET, &own, None).await.is_ok());

        let company_profile = format!("/users/{}", w.company.id);
        assert!(check(&w, &w.seeker, Method::GET, &company_profile, None).await.is_ok());
        assert!(check(&w, &w.faculty, Method::GET, &company_profile, None).await.is_ok());

        let seeker_profile = format!("/users/{}", w.other_seeker.id);
        assert!(check(&w, &w.company, Method::GET, &seeker_profile, None).await.is_ok());
        assert!(matches!(
            check(&w, &w.seeker, Method::GET, &seeker_profile, None).await,
            Err(AppError::NotResourceOwner)
        ));
    }

    #[tokio::test]
    async fn test_profile_query() {
        let w = world();
        let company_id = w.company.id.to_hex();

        assert!(
            check(&w, &w.seeker, Method::GET, "/users/query", Some(&company_id))
                .await
                .is_ok()
        );
        assert!(matches!(
            check(&w, &w.seeker, Method::GET, "/users/query", None).await,
            Err(AppError::NotResourceOwner)
        ));
        assert!(matches!(
            check(&w, &w.seeker, Method::GET, "/users/query", Some(&ObjectId::new().to_hex())).await,
            Err(AppError::ResourceNotFound)
        ));
    }

    #[tokio::test]
    async fn test_profile_update_only_self() {
        let w = world();

        let own = format!("/users/{}", w.company.id);
        assert!(check(&w, &w.company, Method::PUT, &own, None).await.is_ok());

        let other = format!("/users/{}", w.other_company.id);
        assert!(matches!(
            check(&w, &w.company, Method::PUT, &other, None).await,
            Err(AppError::NotResourceOwner)
        ));
    }

    #[tokio::test]
    async fn test_admin_always_owns() {
        let w = world();
        let admin = user(Role::Admin);
        let path = format!("/jobs/{}", ObjectId::new());

        // Passes without touching the store, even for a missing job.
        assert!(check(&w, &admin, Method::PUT, &path, None).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_timeout() {
        let w = world();
        w.repo.set_latency(Some(Duration::from_secs(10)));
        let path = format!("/jobs/{}", w.job.id);

        assert!(matches!(
            check(&w, &w.company, Method::PUT, &path, None).await,
            Err(AppError::PersistenceTimeout(_))
        ));
    }
}
