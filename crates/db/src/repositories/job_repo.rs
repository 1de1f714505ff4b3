//! Repository for the `jobs` table.
//!
//! Every status change is a single conditional `UPDATE` guarded on the
//! expected source status. `None` means the guard did not match; callers
//! (see [`crate::store::PgJobStore`]) re-read the row to explain why.

use fitcoach_core::jobs::{JobKind, JobOwner};
use fitcoach_core::status::{JobStatus, StatusId};
use fitcoach_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::job::{Job, NewJob};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, kind, owner_id, target_week, status_id, current_step, \
    result_reference, error_message, cancel_reason, requested_by, \
    created_at, started_at, completed_at, updated_at";

/// Maximum page size for job listing.
pub const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
pub const DEFAULT_LIMIT: i64 = 50;

/// Name of the partial unique index backing the one-active-job rule.
pub const ACTIVE_OWNER_CONSTRAINT: &str = "uq_jobs_active_owner";

/// Active statuses: pending, processing.
const ACTIVE_STATUSES: [StatusId; 2] = [
    JobStatus::Pending as StatusId,
    JobStatus::Processing as StatusId,
];

/// Provides lifecycle operations for background jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a pending job unless the owner already has an active one.
    ///
    /// Returns `None` when an active job blocked the insert. Two racing
    /// inserts can both pass the `NOT EXISTS` check; the partial unique
    /// index then rejects the loser with a `23505` violation.
    pub async fn submit(pool: &PgPool, input: &NewJob) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (kind, owner_id, target_week, status_id, requested_by) \
             SELECT $1, $2, $3, $4, $5 \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM jobs \
                 WHERE kind = $1 AND owner_id = $2 \
                   AND target_week IS NOT DISTINCT FROM $3 \
                   AND status_id IN ($6, $7) \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.owner.kind().as_str())
            .bind(input.owner.owner_id())
            .bind(input.owner.target_week())
            .bind(JobStatus::Pending.id())
            .bind(input.requested_by)
            .bind(ACTIVE_STATUSES[0])
            .bind(ACTIVE_STATUSES[1])
            .fetch_optional(pool)
            .await
    }

    /// Find the pending or processing job for an owner, if any.
    pub async fn find_active_for_owner(
        pool: &PgPool,
        owner: &JobOwner,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE kind = $1 AND owner_id = $2 \
               AND target_week IS NOT DISTINCT FROM $3 \
               AND status_id IN ($4, $5) \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(owner.kind().as_str())
            .bind(owner.owner_id())
            .bind(owner.target_week())
            .bind(ACTIVE_STATUSES[0])
            .bind(ACTIVE_STATUSES[1])
            .fetch_optional(pool)
            .await
    }

    /// Find the most recently created job for an owner, in any status.
    pub async fn find_latest_for_owner(
        pool: &PgPool,
        owner: &JobOwner,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE kind = $1 AND owner_id = $2 \
               AND target_week IS NOT DISTINCT FROM $3 \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(owner.kind().as_str())
            .bind(owner.owner_id())
            .bind(owner.target_week())
            .fetch_optional(pool)
            .await
    }

    /// Pending jobs, oldest first.
    pub async fn list_pending(pool: &PgPool, limit: i64) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE status_id = $1 \
             ORDER BY created_at ASC, id ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Pending.id())
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// `pending -> processing`; sets `started_at`.
    ///
    /// This is the exclusive gate against double processing: only one
    /// caller can win the guarded update.
    pub async fn mark_processing(pool: &PgPool, job_id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, started_at = NOW() \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .bind(JobStatus::Processing.id())
            .bind(JobStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Overwrite `current_step` while the job is processing.
    pub async fn update_step(
        pool: &PgPool,
        job_id: DbId,
        step: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs SET current_step = $2 \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .bind(step)
            .bind(JobStatus::Processing.id())
            .fetch_optional(pool)
            .await
    }

    /// `processing -> completed` with the produced artifact's id.
    ///
    /// Handlers that write artifacts run this on their own transaction so
    /// the artifacts and the completion commit together; `None` there means
    /// the job was cancelled meanwhile and the transaction must roll back.
    pub async fn complete<'e, E>(
        executor: E,
        job_id: DbId,
        result_reference: Option<DbId>,
    ) -> Result<Option<Job>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, result_reference = $3, completed_at = NOW() \
             WHERE id = $1 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .bind(JobStatus::Completed.id())
            .bind(result_reference)
            .bind(JobStatus::Processing.id())
            .fetch_optional(executor)
            .await
    }

    /// `processing -> failed` with a human-readable message.
    ///
    /// No automatic retry is performed; a trainer re-triggers the work.
    pub async fn fail(
        pool: &PgPool,
        job_id: DbId,
        error: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, error_message = $3, completed_at = NOW() \
             WHERE id = $1 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .bind(JobStatus::Failed.id())
            .bind(error)
            .bind(JobStatus::Processing.id())
            .fetch_optional(pool)
            .await
    }

    /// `pending | processing -> cancelled`.
    pub async fn cancel(
        pool: &PgPool,
        job_id: DbId,
        reason: Option<&str>,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, cancel_reason = $3, completed_at = NOW() \
             WHERE id = $1 AND status_id IN ($4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .bind(JobStatus::Cancelled.id())
            .bind(reason)
            .bind(ACTIVE_STATUSES[0])
            .bind(ACTIVE_STATUSES[1])
            .fetch_optional(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List jobs with optional kind/status filters, newest first.
    pub async fn list(
        pool: &PgPool,
        kind: Option<JobKind>,
        status: Option<JobStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);

        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if kind.is_some() {
            conditions.push(format!("kind = ${bind_idx}"));
            bind_idx += 1;
        }
        if status.is_some() {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, Job>(&query);
        if let Some(kind) = kind {
            q = q.bind(kind.as_str());
        }
        if let Some(status) = status {
            q = q.bind(status.id());
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }
}
