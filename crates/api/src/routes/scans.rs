use axum::extract::DefaultBodyLimit;
use axum::routing::{post, put};
use axum::Router;

use crate::handlers::scans;
use crate::state::AppState;

/// Body-composition scan routes.
///
/// ```text
/// POST   /clients/{id}/scans      upload_scan (multipart `file`)
/// PUT    /scans/{id}/verify       verify_scan
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/clients/{id}/scans",
            post(scans::upload_scan).layer(DefaultBodyLimit::max(scans::MAX_SCAN_BYTES)),
        )
        .route("/scans/{id}/verify", put(scans::verify_scan))
}
