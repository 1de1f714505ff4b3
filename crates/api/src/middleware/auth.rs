//! Bearer-token extractors for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use fitcoach_core::error::CoreError;
use fitcoach_core::types::DbId;

use crate::auth::jwt::{validate_token, ROLE_ADMIN};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated trainer extracted from a JWT Bearer token in the
/// `Authorization` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The trainer's user id (from `claims.sub`).
    pub user_id: DbId,
    /// The user's role name (e.g. `"admin"`, `"trainer"`).
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Trainers may only act on their own clients; admins on any.
    pub fn ensure_trainer_of(&self, trainer_id: DbId) -> Result<(), AppError> {
        if self.is_admin() || self.user_id == trainer_id {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(
                "This client belongs to another trainer".into(),
            )))
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header".into(),
            ))
        })?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>".into(),
        ))
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

/// An external scheduler presenting `CRON_SECRET` as its bearer token.
#[derive(Debug, Clone, Copy)]
pub struct CronCaller;

impl FromRequestParts<AppState> for CronCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.config.cron_secret.as_deref() else {
            return Err(AppError::Core(CoreError::Forbidden(
                "Cron endpoint is disabled".into(),
            )));
        };

        if bearer_token(parts)? != secret {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid cron secret".into(),
            )));
        }
        Ok(CronCaller)
    }
}
