//! Handlers for job status, listing, cancellation and recommendation jobs.
//!
//! Every endpoint requires an [`AuthUser`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fitcoach_core::error::CoreError;
use fitcoach_core::jobs::{JobKind, JobOwner};
use fitcoach_core::status::JobStatus;
use fitcoach_core::types::DbId;
use fitcoach_db::models::job::{Job, JobListQuery, JobView, LatestJobQuery, NewJob};
use fitcoach_db::repositories::{ClientRepo, QuestionnaireRepo, ScanRepo};
use fitcoach_db::store::JobFilter;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body for `POST /api/v1/jobs/{id}/cancel`.
#[derive(Debug, Default, Deserialize)]
pub struct CancelJob {
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn to_view(job: &Job) -> AppResult<JobView> {
    JobView::try_from(job).map_err(AppError::Core)
}

async fn find_job(state: &AppState, job_id: DbId) -> AppResult<Job> {
    state
        .jobs
        .find(job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))
}

/// Load the client and check the caller trains them.
pub(crate) async fn authorize_client(
    state: &AppState,
    auth: &AuthUser,
    client_id: DbId,
) -> AppResult<()> {
    let client = ClientRepo::find_by_id(&state.pool, client_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Client",
            id: client_id,
        }))?;
    auth.ensure_trainer_of(client.trainer_id)
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

/// POST /api/v1/questionnaires/{id}/recommendation-jobs
///
/// Queue generation of a recommendation from a questionnaire. Returns 201
/// with the pending job, or 409 `JOB_ACTIVE` when one is already running.
pub async fn create_recommendation_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(questionnaire_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let questionnaire = QuestionnaireRepo::find_by_id(&state.pool, questionnaire_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Questionnaire",
            id: questionnaire_id,
        }))?;
    authorize_client(&state, &auth, questionnaire.client_id).await?;

    let owner = JobOwner::Recommendation { questionnaire_id };
    let job = state
        .jobs
        .create(&NewJob::new(owner).requested_by(auth.user_id))
        .await?;

    tracing::info!(
        job_id = job.id,
        questionnaire_id,
        user_id = auth.user_id,
        "Recommendation job queued",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: to_view(&job)? })))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, job_id).await?;
    Ok(Json(DataResponse { data: to_view(&job)? }))
}

/// GET /api/v1/jobs/latest?kind=&owner_id=&week=
///
/// The newest job for an owner in any status; `data` is `null` when the
/// owner never had one.
pub async fn latest_job(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<LatestJobQuery>,
) -> AppResult<impl IntoResponse> {
    let owner = params.owner()?;
    let view = match state.jobs.latest_for_owner(&owner).await? {
        Some(job) => Some(to_view(&job)?),
        None => None,
    };
    Ok(Json(DataResponse { data: view }))
}

/// GET /api/v1/jobs?kind=&status=&limit=&offset=
///
/// Newest first. `status=processing` surfaces stuck jobs.
pub async fn list_jobs(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let kind = params
        .kind
        .as_deref()
        .map(|k| {
            JobKind::parse(k)
                .ok_or_else(|| CoreError::Validation(format!("Unknown job kind '{k}'")))
        })
        .transpose()?;
    let status = params
        .status
        .as_deref()
        .map(|s| {
            JobStatus::parse(s)
                .ok_or_else(|| CoreError::Validation(format!("Unknown job status '{s}'")))
        })
        .transpose()?;

    let filter = JobFilter {
        kind,
        status,
        limit: params.limit,
        offset: params.offset,
    };
    let views = state
        .jobs
        .list(&filter)
        .await?
        .iter()
        .map(to_view)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(DataResponse { data: views }))
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/cancel
///
/// Only the trainer who started the job, or an admin, may cancel it.
/// Terminal jobs answer 409 `INVALID_TRANSITION`.
pub async fn cancel_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<CancelJob>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, job_id).await?;
    if job.requested_by != Some(auth.user_id) && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot cancel another trainer's job".into(),
        )));
    }

    let job = state.jobs.cancel(job_id, input.reason.as_deref()).await?;
    tracing::info!(job_id, user_id = auth.user_id, "Job cancelled");

    // A scan whose job never ran would otherwise stay pending.
    if job.job_kind() == Some(JobKind::ScanExtraction) {
        if let Err(e) =
            ScanRepo::mark_extraction_failed(&state.pool, job.owner_id, "Extraction was cancelled").await
        {
            tracing::warn!(job_id, scan_id = job.owner_id, error = %e, "Failed to close cancelled scan");
        }
    }

    Ok(Json(DataResponse { data: to_view(&job)? }))
}
