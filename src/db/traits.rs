//! Persistence boundary
//!
//! The document store itself lives outside this crate. The gates only need
//! point lookups by id, expressed by the [`Repository`] trait. Every call
//! made by the gates is wrapped in [`with_timeout`].
//!
//! # Example
//!
//! ```rust,ignore
//! use jobgate::db::{MemoryRepository, Repository};
//!
//! let repo = MemoryRepository::new();
//! let user = repo.find_user(&user_id).await?;
//! ```

use crate::types::{AppError, FileRecord, Job, JobApplication, ObjectId, Result, User};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Point lookups the authentication and authorization core depends on.
///
/// `Ok(None)` means the document does not exist; `Err` is reserved for
/// store failures.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Find a user by id
    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>>;

    /// Find a job posting by id
    async fn find_job(&self, id: &ObjectId) -> Result<Option<Job>>;

    /// Find a job application by id
    async fn find_application(&self, id: &ObjectId) -> Result<Option<JobApplication>>;

    /// Find stored file metadata by id
    async fn find_file(&self, id: &ObjectId) -> Result<Option<FileRecord>>;
}

/// Runs a persistence call under a deadline. Elapsed deadlines surface as
/// [`AppError::PersistenceTimeout`] tagged with `what`.
pub async fn with_timeout<T, F>(limit: Duration, what: &'static str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| AppError::PersistenceTimeout(what.to_string()))?
}
