use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{jobs, weeks};
use crate::state::AppState;

/// Program generation routes.
///
/// ```text
/// POST   /questionnaires/{id}/recommendation-jobs                create_recommendation_job
/// GET    /recommendations/{id}/weeks/{week}/status               week_status
/// POST   /recommendations/{id}/weeks/{week}/generation-jobs      create_week_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/questionnaires/{id}/recommendation-jobs",
            post(jobs::create_recommendation_job),
        )
        .route(
            "/recommendations/{id}/weeks/{week}/status",
            get(weeks::week_status),
        )
        .route(
            "/recommendations/{id}/weeks/{week}/generation-jobs",
            post(weeks::create_week_job),
        )
}
