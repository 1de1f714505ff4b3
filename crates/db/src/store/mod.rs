//! The Job Store: persisted job records shared by all job kinds.
//!
//! [`JobStore`] is the seam between the lifecycle logic (processor,
//! dispatcher, API handlers) and storage. [`PgJobStore`] is the production
//! implementation; [`InMemoryJobStore`] backs tests and local runs. Both
//! enforce the same rules:
//!
//! - at most one `pending` or `processing` job per `(kind, owner)`;
//! - status changes follow [`fitcoach_core::jobs::state_machine`];
//! - `mark_processing` succeeds for exactly one caller per job.

use async_trait::async_trait;
use fitcoach_core::jobs::{JobKind, JobOwner};
use fitcoach_core::status::JobStatus;
use fitcoach_core::types::DbId;

use crate::models::job::{Job, NewJob};

mod memory;
mod postgres;

pub use memory::InMemoryJobStore;
pub use postgres::PgJobStore;

/// Errors returned by [`JobStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    /// The owner already has an active job of this kind.
    #[error("An active {kind} job already exists for owner {owner_id}")]
    Conflict {
        kind: JobKind,
        owner_id: DbId,
        /// The blocking job, when it could still be read back.
        existing_job_id: Option<DbId>,
    },

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: DbId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {0} not found")]
    NotFound(DbId),

    /// A stored row could not be interpreted (unknown kind or status id).
    #[error("Corrupt job row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Filters for operator job listings.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub kind: Option<JobKind>,
    pub status: Option<JobStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Persistence and lifecycle operations for jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a `pending` job.
    ///
    /// Fails with [`JobStoreError::Conflict`] when the owner already has an
    /// active job of the same kind.
    async fn create(&self, job: &NewJob) -> Result<Job, JobStoreError>;

    async fn find(&self, id: DbId) -> Result<Option<Job>, JobStoreError>;

    /// The most recently created job for an owner, in any status.
    async fn latest_for_owner(&self, owner: &JobOwner) -> Result<Option<Job>, JobStoreError>;

    /// Up to `limit` pending jobs across all kinds, oldest first.
    async fn list_pending(&self, limit: i64) -> Result<Vec<Job>, JobStoreError>;

    /// Jobs matching `filter`, newest first.
    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobStoreError>;

    /// `pending -> processing`; sets `started_at`.
    async fn mark_processing(&self, id: DbId) -> Result<Job, JobStoreError>;

    /// Overwrite `current_step`. Only allowed while `processing`.
    async fn update_step(&self, id: DbId, step: &str) -> Result<Job, JobStoreError>;

    /// `processing -> completed`; sets `completed_at` and `result_reference`.
    async fn mark_completed(
        &self,
        id: DbId,
        result_reference: Option<DbId>,
    ) -> Result<Job, JobStoreError>;

    /// `processing -> failed`; sets `completed_at` and `error_message`.
    async fn mark_failed(&self, id: DbId, error_message: &str) -> Result<Job, JobStoreError>;

    /// `pending | processing -> cancelled`.
    async fn cancel(&self, id: DbId, reason: Option<&str>) -> Result<Job, JobStoreError>;
}

/// Explain why a guarded transition of `job` to `to` did not apply.
pub(crate) fn rejected_transition(job: &Job, to: JobStatus) -> JobStoreError {
    match job.status() {
        Some(from) => JobStoreError::InvalidTransition {
            job_id: job.id,
            from,
            to,
        },
        None => JobStoreError::Corrupt(format!(
            "job {} has unknown status id {}",
            job.id, job.status_id
        )),
    }
}
