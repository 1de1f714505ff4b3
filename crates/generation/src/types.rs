//! Request and response payloads exchanged with the generation service.

use std::collections::HashSet;

use fitcoach_core::status::WorkoutStatus;
use fitcoach_core::types::{DbId, WeekNumber};
use fitcoach_core::week_gate::MAX_PROGRAM_WEEKS;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Questionnaire answers sent for plan generation.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionnaireInput {
    pub questionnaire_id: DbId,
    pub client_id: DbId,
    pub responses: serde_json::Value,
}

/// One generated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedWorkout {
    pub session_number: i16,
    pub name: String,
    #[serde(default)]
    pub exercises: serde_json::Value,
}

/// A generated multi-week plan with its first week of sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRecommendation {
    pub title: String,
    pub plan_structure: serde_json::Value,
    pub total_weeks: WeekNumber,
    pub first_week: Vec<GeneratedWorkout>,
}

impl GeneratedRecommendation {
    /// Reject plans that cannot be stored as-is.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.title.trim().is_empty() {
            return Err(GenerationError::Unusable("plan has no title".to_string()));
        }
        if !(1..=MAX_PROGRAM_WEEKS).contains(&self.total_weeks) {
            return Err(GenerationError::Unusable(format!(
                "plan spans {} weeks; expected 1 to {MAX_PROGRAM_WEEKS}",
                self.total_weeks
            )));
        }
        validate_week(&self.first_week)
    }
}

/// Context for generating one week of a running program.
#[derive(Debug, Clone, Serialize)]
pub struct WeekRequest {
    pub recommendation_id: DbId,
    pub title: String,
    pub plan_structure: serde_json::Value,
    pub target_week: WeekNumber,
    pub total_weeks: WeekNumber,
    /// Sessions of the week before `target_week`, for progression.
    pub previous_week: Vec<PreviousWorkout>,
}

/// How a session of the previous week went.
#[derive(Debug, Clone, Serialize)]
pub struct PreviousWorkout {
    pub session_number: i16,
    pub name: String,
    pub status: WorkoutStatus,
}

/// A week must have at least one session, positive and unique session
/// numbers, and named sessions.
pub fn validate_week(workouts: &[GeneratedWorkout]) -> Result<(), GenerationError> {
    if workouts.is_empty() {
        return Err(GenerationError::Unusable(
            "no workouts were generated".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for workout in workouts {
        if workout.session_number < 1 {
            return Err(GenerationError::Unusable(format!(
                "invalid session number {}",
                workout.session_number
            )));
        }
        if !seen.insert(workout.session_number) {
            return Err(GenerationError::Unusable(format!(
                "session {} generated twice",
                workout.session_number
            )));
        }
        if workout.name.trim().is_empty() {
            return Err(GenerationError::Unusable(format!(
                "session {} has no name",
                workout.session_number
            )));
        }
    }
    Ok(())
}
