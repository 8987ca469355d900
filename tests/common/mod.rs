//! Shared fixtures for integration tests.
#![allow(dead_code)]

use axum::{
    Router,
    http::{HeaderName, HeaderValue, header},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use axum_test::TestServer;
use jobgate::{
    AppState, GateConfig,
    api::{handlers::auth::start_session, handlers::system::echo_principal, routes::create_router},
    db::MemoryRepository,
    types::{FileRecord, Identity, Job, JobApplication, ObjectId, Role, TokenPair, User},
};
use std::sync::Arc;

pub const SECRET: &str = "integration-test-secret-at-least-32-chars";

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub repo: Arc<MemoryRepository>,
}

/// Stand-ins for the platform's resource handlers. Every one echoes the
/// admitted principal; unrouted paths fall back to the same handler.
fn resource_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(echo_principal).post(echo_principal))
        .route("/jobs/query", get(echo_principal))
        .route(
            "/jobs/{id}",
            get(echo_principal).put(echo_principal).delete(echo_principal),
        )
        .route("/apply", get(echo_principal).post(echo_principal))
        .route(
            "/apply/{id}",
            get(echo_principal).put(echo_principal).delete(echo_principal),
        )
        .route("/files/user/{user_id}", get(echo_principal))
        .route("/files/download/{id}", get(echo_principal))
        .route("/users", get(echo_principal).post(echo_principal))
        .route("/users/query", get(echo_principal))
        .route(
            "/users/{id}",
            get(echo_principal).put(echo_principal).delete(echo_principal),
        )
        .fallback(echo_principal)
}

pub fn test_app_with(config: GateConfig) -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    let state = AppState::with_secret(config, repo.clone(), SECRET.to_string());
    let app = create_router(state.clone(), resource_routes());
    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp { server, state, repo }
}

pub fn test_app() -> TestApp {
    test_app_with(GateConfig::default())
}

impl TestApp {
    pub fn add_user(&self, role: Role) -> User {
        let user = User {
            id: ObjectId::new(),
            email: format!("{}@example.com", role),
            name: format!("Test {}", role),
            avatar_url: String::new(),
            role,
            verified: true,
            banned: false,
        };
        self.repo.put_user(user.clone());
        user
    }

    pub fn add_job(&self, company: &User) -> Job {
        let job = Job {
            id: ObjectId::new(),
            company_id: company.id,
        };
        self.repo.put_job(job.clone());
        job
    }

    pub fn add_application(&self, job: &Job, applicant: &User) -> JobApplication {
        let application = JobApplication {
            id: ObjectId::new(),
            job_id: job.id,
            applicant_id: applicant.id,
        };
        self.repo.put_application(application.clone());
        application
    }

    pub fn add_file(&self, owner: &User) -> FileRecord {
        let file = FileRecord {
            id: ObjectId::new(),
            user_id: owner.id,
        };
        self.repo.put_file(file.clone());
        file
    }

    /// What the OAuth callback does after the provider handshake.
    pub async fn login(&self, user: &User) -> TokenPair {
        let identity = Identity {
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
        };
        let (_, pair) = start_session(&self.state, &identity, CookieJar::new())
            .await
            .expect("login should succeed");
        pair
    }
}

pub fn cookie(pairs: &[(&str, &str)]) -> (HeaderName, HeaderValue) {
    let value = pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");
    (header::COOKIE, HeaderValue::from_str(&value).expect("valid cookie header"))
}

pub fn access_cookie(pair: &TokenPair) -> (HeaderName, HeaderValue) {
    cookie(&[("access_token", &pair.access_token)])
}

pub fn refresh_cookie(pair: &TokenPair) -> (HeaderName, HeaderValue) {
    cookie(&[("refresh_token", &pair.refresh_token)])
}

pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("valid header"),
    )
}

pub fn debug_identity(user_id: &str, role: &str) -> [(HeaderName, HeaderValue); 2] {
    [
        (
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_str(user_id).expect("valid header"),
        ),
        (
            HeaderName::from_static("x-user-role"),
            HeaderValue::from_str(role).expect("valid header"),
        ),
    ]
}
