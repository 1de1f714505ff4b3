use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::middleware::auth::CronCaller;
use crate::response::DataResponse;
use crate::state::AppState;

/// Whether this call started a sweep.
#[derive(Debug, Serialize)]
pub struct SweepStarted {
    /// `false` when a sweep was already running; nothing new was started.
    pub started: bool,
}

/// POST /api/v1/cron/process-jobs
///
/// Kick off one dispatcher sweep and return immediately with 202. The sweep
/// runs on its own task, so the request timeout cannot abandon a claimed
/// job halfway. Meant for an external scheduler when no worker process is
/// running; progress is visible through the job endpoints.
pub async fn process_jobs(_cron: CronCaller, State(state): State<AppState>) -> impl IntoResponse {
    let started = state.dispatcher.spawn_sweep().is_some();
    if started {
        tracing::info!("Cron sweep started");
    } else {
        tracing::info!("Cron sweep already running; nothing started");
    }
    (StatusCode::ACCEPTED, Json(DataResponse { data: SweepStarted { started } }))
}
