use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fitcoach_core::error::CoreError;
use fitcoach_core::types::DbId;
use fitcoach_core::week_gate::WeekGateError;
use fitcoach_db::store::JobStoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `fitcoach_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The owner already has a pending or processing job.
    #[error("{message}")]
    JobActive {
        job_id: Option<DbId>,
        message: String,
    },

    /// The week-completion gate refused the next week.
    #[error("{0}")]
    WeekIncomplete(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<JobStoreError> for AppError {
    fn from(err: JobStoreError) -> Self {
        match err {
            JobStoreError::Conflict {
                existing_job_id, ..
            } => AppError::JobActive {
                job_id: existing_job_id,
                message: err.to_string(),
            },
            JobStoreError::InvalidTransition { .. } => {
                AppError::Core(CoreError::InvalidTransition(err.to_string()))
            }
            JobStoreError::NotFound(id) => AppError::Core(CoreError::NotFound { entity: "Job", id }),
            JobStoreError::Corrupt(msg) => AppError::InternalError(msg),
            JobStoreError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<WeekGateError> for AppError {
    fn from(err: WeekGateError) -> Self {
        match err {
            WeekGateError::Incomplete { .. } => AppError::WeekIncomplete(err.to_string()),
            WeekGateError::NotNextWeek { .. } => AppError::Core(CoreError::Conflict(err.to_string())),
            WeekGateError::BeyondProgram { .. } => {
                AppError::Core(CoreError::Validation(err.to_string()))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::InvalidTransition(msg) => {
                    (StatusCode::CONFLICT, "INVALID_TRANSITION", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- Job coordination ---
            AppError::JobActive { job_id, message } => {
                let body = json!({
                    "error": message,
                    "code": "JOB_ACTIVE",
                    "job_id": job_id,
                });
                return (StatusCode::CONFLICT, axum::Json(body)).into_response();
            }
            AppError::WeekIncomplete(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "WEEK_INCOMPLETE",
                msg.clone(),
            ),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

