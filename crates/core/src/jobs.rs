//! Job kinds, owners, and the job lifecycle state machine.
//!
//! All three kinds of background work (recommendation generation, week
//! generation, scan extraction) share one job shape and one state machine.
//! The kind tag selects the processor; the owner identifies the entity the
//! job works on and scopes the one-active-job rule.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::polling;
use crate::status::JobStatus;
use crate::types::{DbId, WeekNumber};

/// Longest `current_step` text that is stored; longer text is truncated.
pub const MAX_STEP_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// The kind of work a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Recommendation,
    WeekGeneration,
    ScanExtraction,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [
        JobKind::Recommendation,
        JobKind::WeekGeneration,
        JobKind::ScanExtraction,
    ];

    /// Value stored in the `jobs.kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Recommendation => "recommendation",
            JobKind::WeekGeneration => "week_generation",
            JobKind::ScanExtraction => "scan_extraction",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "recommendation" => Some(JobKind::Recommendation),
            "week_generation" => Some(JobKind::WeekGeneration),
            "scan_extraction" => Some(JobKind::ScanExtraction),
            _ => None,
        }
    }

    /// How often a client should re-check a job of this kind.
    pub fn poll_interval(self) -> Duration {
        polling::poll_interval_for(self)
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Owner
// ---------------------------------------------------------------------------

/// The entity a job works on. Each variant fixes the job kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobOwner {
    /// A questionnaire awaiting a generated recommendation.
    Recommendation { questionnaire_id: DbId },
    /// The next week of a recommendation's program.
    WeekGeneration {
        recommendation_id: DbId,
        week_number: WeekNumber,
    },
    /// An uploaded InBody scan awaiting extraction.
    ScanExtraction { scan_id: DbId },
}

impl JobOwner {
    pub fn kind(&self) -> JobKind {
        match self {
            JobOwner::Recommendation { .. } => JobKind::Recommendation,
            JobOwner::WeekGeneration { .. } => JobKind::WeekGeneration,
            JobOwner::ScanExtraction { .. } => JobKind::ScanExtraction,
        }
    }

    /// Value stored in `jobs.owner_id`.
    pub fn owner_id(&self) -> DbId {
        match *self {
            JobOwner::Recommendation { questionnaire_id } => questionnaire_id,
            JobOwner::WeekGeneration {
                recommendation_id, ..
            } => recommendation_id,
            JobOwner::ScanExtraction { scan_id } => scan_id,
        }
    }

    /// Value stored in `jobs.target_week` (week-generation jobs only).
    pub fn target_week(&self) -> Option<WeekNumber> {
        match *self {
            JobOwner::WeekGeneration { week_number, .. } => Some(week_number),
            _ => None,
        }
    }

    /// Rebuild an owner from the stored columns.
    ///
    /// Fails when a week-generation row is missing its target week.
    pub fn from_parts(
        kind: JobKind,
        owner_id: DbId,
        target_week: Option<WeekNumber>,
    ) -> Result<Self, CoreError> {
        match kind {
            JobKind::Recommendation => Ok(JobOwner::Recommendation {
                questionnaire_id: owner_id,
            }),
            JobKind::WeekGeneration => {
                let week_number = target_week.ok_or_else(|| {
                    CoreError::Validation(
                        "Week-generation jobs require a target week".to_string(),
                    )
                })?;
                Ok(JobOwner::WeekGeneration {
                    recommendation_id: owner_id,
                    week_number,
                })
            }
            JobKind::ScanExtraction => Ok(JobOwner::ScanExtraction { scan_id: owner_id }),
        }
    }
}

/// Clamp progress text to [`MAX_STEP_LEN`] characters.
pub fn truncate_step(step: &str) -> String {
    step.chars().take(MAX_STEP_LEN).collect()
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Job lifecycle transitions.
///
/// ```text
/// pending -> processing -> completed | failed
/// pending | processing -> cancelled
/// ```
///
/// Terminal states have no outgoing edges.
pub mod state_machine {
    use super::{CoreError, JobStatus};

    /// Returns the set of statuses reachable from `from`.
    pub fn valid_transitions(from: JobStatus) -> &'static [JobStatus] {
        match from {
            JobStatus::Pending => &[JobStatus::Processing, JobStatus::Cancelled],
            JobStatus::Processing => &[
                JobStatus::Completed,
                JobStatus::Failed,
                JobStatus::Cancelled,
            ],
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning `InvalidTransition` for invalid ones.
    pub fn validate_transition(from: JobStatus, to: JobStatus) -> Result<(), CoreError> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition(format!("{from} -> {to}")))
        }
    }
}
