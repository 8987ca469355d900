//! In-memory [`Repository`] used by tests and the development server.

use super::traits::Repository;
use crate::types::{AppError, FileRecord, Job, JobApplication, ObjectId, Result, User};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Documents used to seed a [`MemoryRepository`], e.g. from a JSON fixture.
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub applications: Vec<JobApplication>,
    #[serde(default)]
    pub files: Vec<FileRecord>,
}

/// Thread-safe in-memory document store.
#[derive(Default)]
pub struct MemoryRepository {
    users: RwLock<HashMap<ObjectId, User>>,
    jobs: RwLock<HashMap<ObjectId, Job>>,
    applications: RwLock<HashMap<ObjectId, JobApplication>>,
    files: RwLock<HashMap<ObjectId, FileRecord>>,
    latency: RwLock<Option<Duration>>,
    outage: RwLock<bool>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: Seed) -> Self {
        let repo = Self::new();
        for user in seed.users {
            repo.put_user(user);
        }
        for job in seed.jobs {
            repo.put_job(job);
        }
        for application in seed.applications {
            repo.put_application(application);
        }
        for file in seed.files {
            repo.put_file(file);
        }
        repo
    }

    pub fn put_user(&self, user: User) {
        self.users.write().insert(user.id, user);
    }

    pub fn put_job(&self, job: Job) {
        self.jobs.write().insert(job.id, job);
    }

    pub fn put_application(&self, application: JobApplication) {
        self.applications.write().insert(application.id, application);
    }

    pub fn put_file(&self, file: FileRecord) {
        self.files.write().insert(file.id, file);
    }

    /// Flip a user's ban flag. Returns false if the user does not exist.
    pub fn set_banned(&self, id: &ObjectId, banned: bool) -> bool {
        match self.users.write().get_mut(id) {
            Some(user) => {
                user.banned = banned;
                true
            }
            None => false,
        }
    }

    /// Change a user's role. Returns false if the user does not exist.
    pub fn set_role(&self, id: &ObjectId, role: crate::types::Role) -> bool {
        match self.users.write().get_mut(id) {
            Some(user) => {
                user.role = role;
                true
            }
            None => false,
        }
    }

    /// Delay every lookup, for exercising persistence timeouts
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Make every lookup fail with a store error until switched off
    pub fn set_outage(&self, down: bool) {
        *self.outage.write() = down;
    }

    async fn before_lookup(&self) -> Result<()> {
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if *self.outage.read() {
            return Err(AppError::Database("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>> {
        self.before_lookup().await?;
        Ok(self.users.read().get(id).cloned())
    }

    async fn find_job(&self, id: &ObjectId) -> Result<Option<Job>> {
        self.before_lookup().await?;
        Ok(self.jobs.read().get(id).cloned())
    }

    async fn find_application(&self, id: &ObjectId) -> Result<Option<JobApplication>> {
        self.before_lookup().await?;
        Ok(self.applications.read().get(id).cloned())
    }

    async fn find_file(&self, id: &ObjectId) -> Result<Option<FileRecord>> {
        self.before_lookup().await?;
        Ok(self.files.read().get(id).cloned())
    }
}
