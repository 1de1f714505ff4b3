//! Week-completion gate for progressive program generation.
//!
//! A program week is complete when every workout in it was either completed
//! or skipped. Cancelled workouts keep the week open so the session can be
//! restarted. The next week may only be generated once the current one is
//! complete, and always as exactly `current_week + 1`.
//!
//! Callers must evaluate the gate from freshly loaded workout rows right
//! before creating a week-generation job.

use serde::Serialize;

use crate::status::WorkoutStatus;
use crate::types::WeekNumber;

/// Maximum number of weeks a generated program may span.
pub const MAX_PROGRAM_WEEKS: WeekNumber = 6;

/// Per-status workout counts for one program week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WeekStatus {
    pub total: u32,
    pub completed: u32,
    pub skipped: u32,
    pub in_progress: u32,
    pub scheduled: u32,
    pub cancelled: u32,
    pub is_complete: bool,
}

impl WeekStatus {
    /// Workouts still blocking completion.
    pub fn remaining(&self) -> u32 {
        self.total - self.completed - self.skipped
    }
}

/// Count workout statuses for a week and decide completeness.
///
/// A week with no workouts is vacuously complete.
pub fn evaluate<I>(statuses: I) -> WeekStatus
where
    I: IntoIterator<Item = WorkoutStatus>,
{
    let mut week = WeekStatus::default();
    for status in statuses {
        week.total += 1;
        match status {
            WorkoutStatus::Completed => week.completed += 1,
            WorkoutStatus::Skipped => week.skipped += 1,
            WorkoutStatus::InProgress => week.in_progress += 1,
            WorkoutStatus::Scheduled => week.scheduled += 1,
            WorkoutStatus::Cancelled => week.cancelled += 1,
        }
    }
    week.is_complete = week.remaining() == 0;
    week
}

/// Why a week-generation request was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeekGateError {
    #[error("Week {requested} cannot be generated; the next week is {expected}")]
    NotNextWeek {
        requested: WeekNumber,
        expected: WeekNumber,
    },

    #[error("Week {requested} is beyond the {total_weeks}-week program")]
    BeyondProgram {
        requested: WeekNumber,
        total_weeks: WeekNumber,
    },

    #[error("Week {week} is not complete: {remaining} workout(s) still open")]
    Incomplete { week: WeekNumber, remaining: u32 },
}

/// Decide whether `requested_week` may be generated now.
///
/// `current` must describe the workouts of `current_week`.
pub fn check_next_week(
    current_week: WeekNumber,
    total_weeks: WeekNumber,
    requested_week: WeekNumber,
    current: &WeekStatus,
) -> Result<(), WeekGateError> {
    let expected = current_week + 1;
    if requested_week != expected {
        return Err(WeekGateError::NotNextWeek {
            requested: requested_week,
            expected,
        });
    }
    let limit = total_weeks.min(MAX_PROGRAM_WEEKS);
    if requested_week > limit {
        return Err(WeekGateError::BeyondProgram {
            requested: requested_week,
            total_weeks: limit,
        });
    }
    if !current.is_complete {
        return Err(WeekGateError::Incomplete {
            week: current_week,
            remaining: current.remaining(),
        });
    }
    Ok(())
}
