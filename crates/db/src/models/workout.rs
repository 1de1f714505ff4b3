use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use fitcoach_core::status::{StatusId, WorkoutStatus};
use fitcoach_core::types::{DbId, Timestamp, WeekNumber};

/// A row from the `workouts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Workout {
    pub id: DbId,
    pub recommendation_id: DbId,
    pub week_number: WeekNumber,
    pub session_number: i16,
    pub name: String,
    pub exercises: serde_json::Value,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Workout {
    pub fn status(&self) -> Option<WorkoutStatus> {
        WorkoutStatus::from_id(self.status_id)
    }
}

/// One session of a generated week, before it is written.
///
/// The recommendation and week are supplied by the repository call so a
/// whole week is always inserted together.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWorkout {
    pub session_number: i16,
    pub name: String,
    pub exercises: serde_json::Value,
}
