//! Job entity models and DTOs for background generation and extraction work.

use fitcoach_core::error::CoreError;
use fitcoach_core::jobs::{JobKind, JobOwner};
use fitcoach_core::status::{JobStatus, StatusId};
use fitcoach_core::types::{DbId, Timestamp, WeekNumber};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub kind: String,
    pub owner_id: DbId,
    pub target_week: Option<WeekNumber>,
    pub status_id: StatusId,
    pub current_step: Option<String>,
    pub result_reference: Option<DbId>,
    pub error_message: Option<String>,
    pub cancel_reason: Option<String>,
    pub requested_by: Option<DbId>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl Job {
    pub fn status(&self) -> Option<JobStatus> {
        JobStatus::from_id(self.status_id)
    }

    pub fn job_kind(&self) -> Option<JobKind> {
        JobKind::parse(&self.kind)
    }

    /// Rebuild the typed owner from the `kind`, `owner_id`, and
    /// `target_week` columns.
    pub fn owner(&self) -> Result<JobOwner, CoreError> {
        let kind = self.job_kind().ok_or_else(|| {
            CoreError::Internal(format!("Job {} has unknown kind '{}'", self.id, self.kind))
        })?;
        JobOwner::from_parts(kind, self.owner_id, self.target_week)
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_some_and(JobStatus::is_terminal)
    }
}

/// Insert DTO for a new pending job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub owner: JobOwner,
    /// The trainer who started the job, when started over HTTP.
    pub requested_by: Option<DbId>,
}

impl NewJob {
    pub fn new(owner: JobOwner) -> Self {
        Self {
            owner,
            requested_by: None,
        }
    }

    pub fn requested_by(mut self, user_id: DbId) -> Self {
        self.requested_by = Some(user_id);
        self
    }
}

/// The status payload returned to polling clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobView {
    pub id: DbId,
    pub kind: JobKind,
    pub owner_id: DbId,
    pub target_week: Option<WeekNumber>,
    pub status: JobStatus,
    pub current_step: Option<String>,
    pub result_reference: Option<DbId>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl TryFrom<&Job> for JobView {
    type Error = CoreError;

    fn try_from(job: &Job) -> Result<Self, Self::Error> {
        let kind = job.job_kind().ok_or_else(|| {
            CoreError::Internal(format!("Job {} has unknown kind '{}'", job.id, job.kind))
        })?;
        let status = job.status().ok_or_else(|| {
            CoreError::Internal(format!(
                "Job {} has unknown status id {}",
                job.id, job.status_id
            ))
        })?;
        Ok(Self {
            id: job.id,
            kind,
            owner_id: job.owner_id,
            target_week: job.target_week,
            status,
            current_step: job.current_step.clone(),
            result_reference: job.result_reference,
            error_message: job.error_message.clone(),
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        })
    }
}

/// Query parameters for `GET /api/v1/jobs`.
#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    /// Filter by kind name (e.g. `week_generation`).
    pub kind: Option<String>,
    /// Filter by status name (e.g. `processing` to find stuck jobs).
    pub status: Option<String>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Query parameters for `GET /api/v1/jobs/latest`.
#[derive(Debug, Deserialize)]
pub struct LatestJobQuery {
    pub kind: String,
    pub owner_id: DbId,
    /// Required when `kind` is `week_generation`.
    pub week: Option<WeekNumber>,
}

impl LatestJobQuery {
    pub fn owner(&self) -> Result<JobOwner, CoreError> {
        let kind = JobKind::parse(&self.kind)
            .ok_or_else(|| CoreError::Validation(format!("Unknown job kind '{}'", self.kind)))?;
        JobOwner::from_parts(kind, self.owner_id, self.week)
    }
}
