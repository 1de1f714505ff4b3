//! Generated multi-week training plans.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use fitcoach_core::status::{RecommendationStatus, StatusId};
use fitcoach_core::types::{DbId, Timestamp, WeekNumber};

/// A row from the `recommendations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Recommendation {
    pub id: DbId,
    pub client_id: DbId,
    pub questionnaire_id: Option<DbId>,
    pub status_id: StatusId,
    pub title: String,
    pub current_week: WeekNumber,
    pub total_weeks: WeekNumber,
    pub plan_structure: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Recommendation {
    pub fn status(&self) -> Option<RecommendationStatus> {
        RecommendationStatus::from_id(self.status_id)
    }
}

/// Insert DTO. Recommendations are only ever created by a completed
/// recommendation job, so there is no HTTP create endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecommendation {
    pub client_id: DbId,
    pub questionnaire_id: Option<DbId>,
    pub title: String,
    pub total_weeks: WeekNumber,
    pub plan_structure: serde_json::Value,
}
