//! Week status and week-generation jobs for a recommendation's program.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fitcoach_core::error::CoreError;
use fitcoach_core::jobs::JobOwner;
use fitcoach_core::status::WorkoutStatus;
use fitcoach_core::types::{DbId, WeekNumber};
use fitcoach_core::week_gate::{self, WeekStatus};
use fitcoach_db::models::job::NewJob;
use fitcoach_db::models::recommendation::Recommendation;
use fitcoach_db::repositories::{RecommendationRepo, WorkoutRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::handlers::jobs::{authorize_client, to_view};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Response for `GET /recommendations/{id}/weeks/{week}/status`.
#[derive(Debug, Serialize)]
pub struct WeekStatusResponse {
    pub recommendation_id: DbId,
    pub week_number: WeekNumber,
    /// The latest week generated so far.
    pub current_week: WeekNumber,
    #[serde(flatten)]
    pub status: WeekStatus,
}

async fn find_recommendation(state: &AppState, id: DbId) -> AppResult<Recommendation> {
    RecommendationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Recommendation",
            id,
        }))
}

/// Read the week's workout statuses from the database and evaluate them.
async fn load_week_status(
    state: &AppState,
    recommendation_id: DbId,
    week: WeekNumber,
) -> AppResult<WeekStatus> {
    let statuses = WorkoutRepo::week_status_ids(&state.pool, recommendation_id, week)
        .await?
        .into_iter()
        .map(|id| {
            WorkoutStatus::from_id(id).ok_or_else(|| {
                AppError::InternalError(format!("Unknown workout status id {id}"))
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    Ok(week_gate::evaluate(statuses))
}

/// GET /api/v1/recommendations/{id}/weeks/{week}/status
pub async fn week_status(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((recommendation_id, week)): Path<(DbId, WeekNumber)>,
) -> AppResult<impl IntoResponse> {
    let recommendation = find_recommendation(&state, recommendation_id).await?;
    if week < 1 || week > recommendation.total_weeks {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Week {week} is outside the {}-week program",
            recommendation.total_weeks
        ))));
    }

    let status = load_week_status(&state, recommendation_id, week).await?;
    Ok(Json(DataResponse {
        data: WeekStatusResponse {
            recommendation_id,
            week_number: week,
            current_week: recommendation.current_week,
            status,
        },
    }))
}

/// POST /api/v1/recommendations/{id}/weeks/{week}/generation-jobs
///
/// Re-evaluates the current week from fresh workout rows before queuing the
/// job. Answers 422 `WEEK_INCOMPLETE` while workouts remain open and 409
/// when `week` is not the next week.
pub async fn create_week_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((recommendation_id, week)): Path<(DbId, WeekNumber)>,
) -> AppResult<impl IntoResponse> {
    let recommendation = find_recommendation(&state, recommendation_id).await?;
    authorize_client(&state, &auth, recommendation.client_id).await?;

    let current = load_week_status(&state, recommendation_id, recommendation.current_week).await?;
    week_gate::check_next_week(
        recommendation.current_week,
        recommendation.total_weeks,
        week,
        &current,
    )?;

    let owner = JobOwner::WeekGeneration {
        recommendation_id,
        week_number: week,
    };
    let job = state
        .jobs
        .create(&NewJob::new(owner).requested_by(auth.user_id))
        .await?;

    tracing::info!(
        job_id = job.id,
        recommendation_id,
        week,
        user_id = auth.user_id,
        "Week generation job queued",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: to_view(&job)? })))
}
