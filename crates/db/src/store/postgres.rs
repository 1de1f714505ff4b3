use async_trait::async_trait;
use fitcoach_core::jobs::{truncate_step, JobOwner};
use fitcoach_core::status::JobStatus;
use fitcoach_core::types::DbId;
use sqlx::PgPool;

use super::{rejected_transition, JobFilter, JobStore, JobStoreError};
use crate::models::job::{Job, NewJob};
use crate::repositories::job_repo::ACTIVE_OWNER_CONSTRAINT;
use crate::repositories::JobRepo;

/// [`JobStore`] backed by the `jobs` table.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve a guarded update that matched no row.
    async fn explain(&self, id: DbId, to: JobStatus) -> JobStoreError {
        match JobRepo::find_by_id(&self.pool, id).await {
            Ok(Some(job)) => rejected_transition(&job, to),
            Ok(None) => JobStoreError::NotFound(id),
            Err(e) => JobStoreError::Database(e),
        }
    }

    async fn conflict(&self, owner: &JobOwner) -> JobStoreError {
        let existing_job_id = match JobRepo::find_active_for_owner(&self.pool, owner).await {
            Ok(job) => job.map(|j| j.id),
            Err(e) => return JobStoreError::Database(e),
        };
        JobStoreError::Conflict {
            kind: owner.kind(),
            owner_id: owner.owner_id(),
            existing_job_id,
        }
    }

    async fn guarded(
        &self,
        id: DbId,
        to: JobStatus,
        result: Result<Option<Job>, sqlx::Error>,
    ) -> Result<Job, JobStoreError> {
        match result? {
            Some(job) => Ok(job),
            None => Err(self.explain(id, to).await),
        }
    }
}

fn is_active_owner_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("23505")
                && db.constraint() == Some(ACTIVE_OWNER_CONSTRAINT)
        }
        _ => false,
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: &NewJob) -> Result<Job, JobStoreError> {
        match JobRepo::submit(&self.pool, job).await {
            Ok(Some(created)) => {
                tracing::debug!(
                    job_id = created.id,
                    kind = %job.owner.kind(),
                    owner_id = job.owner.owner_id(),
                    "Job created",
                );
                Ok(created)
            }
            Ok(None) => Err(self.conflict(&job.owner).await),
            Err(e) if is_active_owner_violation(&e) => Err(self.conflict(&job.owner).await),
            Err(e) => Err(e.into()),
        }
    }

    async fn find(&self, id: DbId) -> Result<Option<Job>, JobStoreError> {
        Ok(JobRepo::find_by_id(&self.pool, id).await?)
    }

    async fn latest_for_owner(&self, owner: &JobOwner) -> Result<Option<Job>, JobStoreError> {
        Ok(JobRepo::find_latest_for_owner(&self.pool, owner).await?)
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<Job>, JobStoreError> {
        Ok(JobRepo::list_pending(&self.pool, limit).await?)
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobStoreError> {
        Ok(JobRepo::list(&self.pool, filter.kind, filter.status, filter.limit, filter.offset).await?)
    }

    async fn mark_processing(&self, id: DbId) -> Result<Job, JobStoreError> {
        let result = JobRepo::mark_processing(&self.pool, id).await;
        self.guarded(id, JobStatus::Processing, result).await
    }

    async fn update_step(&self, id: DbId, step: &str) -> Result<Job, JobStoreError> {
        let result = JobRepo::update_step(&self.pool, id, &truncate_step(step)).await;
        self.guarded(id, JobStatus::Processing, result).await
    }

    async fn mark_completed(
        &self,
        id: DbId,
        result_reference: Option<DbId>,
    ) -> Result<Job, JobStoreError> {
        let result = JobRepo::complete(&self.pool, id, result_reference).await;
        self.guarded(id, JobStatus::Completed, result).await
    }

    async fn mark_failed(&self, id: DbId, error_message: &str) -> Result<Job, JobStoreError> {
        let result = JobRepo::fail(&self.pool, id, error_message).await;
        self.guarded(id, JobStatus::Failed, result).await
    }

    async fn cancel(&self, id: DbId, reason: Option<&str>) -> Result<Job, JobStoreError> {
        let result = JobRepo::cancel(&self.pool, id, reason).await;
        self.guarded(id, JobStatus::Cancelled, result).await
    }
}
