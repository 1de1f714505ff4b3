use axum::routing::post;
use axum::Router;

use crate::handlers::cron;
use crate::state::AppState;

/// Scheduler hooks, nested under `/cron`.
///
/// ```text
/// POST   /process-jobs      process_jobs (bearer CRON_SECRET)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/process-jobs", post(cron::process_jobs))
}
