pub mod cron;
pub mod health;
pub mod jobs;
pub mod recommendations;
pub mod scans;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /questionnaires/{id}/recommendation-jobs      start a recommendation job
/// /recommendations/{id}/weeks/{week}/...        week status, week generation jobs
/// /clients/{id}/scans                           scan upload
/// /scans/{id}/verify                            trainer-confirmed measurements
/// /jobs                                         job status, latest, list, cancel
/// /cron/process-jobs                            start a background dispatcher sweep
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(recommendations::router())
        .merge(scans::router())
        .nest("/jobs", jobs::router())
        .nest("/cron", cron::router())
}
