use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Job status routes, nested under `/jobs`.
///
/// ```text
/// GET    /                  list_jobs (?kind, status, limit, offset)
/// GET    /latest            latest_job (?kind, owner_id, week)
/// GET    /{id}              get_job
/// POST   /{id}/cancel       cancel_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs))
        .route("/latest", get(jobs::latest_job))
        .route("/{id}", get(jobs::get_job))
        .route("/{id}/cancel", post(jobs::cancel_job))
}
