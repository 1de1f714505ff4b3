//! Poller state machine.
//!
//! Transitions are pure functions of the current state and the latest
//! observation, so every edge is unit-testable without timers.

use fitcoach_core::status::JobStatus;
use fitcoach_core::types::DbId;
use serde::Serialize;

use crate::api::JobSnapshot;
use crate::error::PollError;

/// How a followed job ended, from the client's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    Completed { result_reference: Option<DbId> },
    /// The server's error message, shown to the trainer verbatim.
    Failed { error_message: String },
    Cancelled,
    /// Too many consecutive status requests failed. The job itself may
    /// still finish; `resume` picks it up again.
    Unreachable { last_error: String },
    /// A status request failed in a way retrying cannot fix, e.g. the job
    /// is gone or the session expired.
    Rejected { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PollerState {
    /// No job is being followed.
    Idle,
    Polling {
        job_id: DbId,
        current_step: Option<String>,
        consecutive_failures: u32,
    },
    Terminal(PollOutcome),
}

impl PollerState {
    /// State implied by a fresh job snapshot.
    pub fn observe(job: &JobSnapshot) -> Self {
        match job.status {
            JobStatus::Pending | JobStatus::Processing => PollerState::Polling {
                job_id: job.id,
                current_step: job.current_step.clone(),
                consecutive_failures: 0,
            },
            JobStatus::Completed => PollerState::Terminal(PollOutcome::Completed {
                result_reference: job.result_reference,
            }),
            JobStatus::Failed => PollerState::Terminal(PollOutcome::Failed {
                error_message: job
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Job failed".to_string()),
            }),
            JobStatus::Cancelled => PollerState::Terminal(PollOutcome::Cancelled),
        }
    }

    /// Count a failed status request. Reaching `max_failures` in a row
    /// ends polling as [`PollOutcome::Unreachable`]; a non-transient error
    /// ends it at once as [`PollOutcome::Rejected`].
    pub fn record_failure(self, error: &PollError, max_failures: u32) -> Self {
        match self {
            PollerState::Polling { .. } if !error.is_transient() => {
                PollerState::Terminal(PollOutcome::Rejected {
                    error: error.to_string(),
                })
            }
            PollerState::Polling {
                job_id,
                current_step,
                consecutive_failures,
            } => {
                let failures = consecutive_failures + 1;
                if failures >= max_failures {
                    PollerState::Terminal(PollOutcome::Unreachable {
                        last_error: error.to_string(),
                    })
                } else {
                    PollerState::Polling {
                        job_id,
                        current_step,
                        consecutive_failures: failures,
                    }
                }
            }
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PollerState::Terminal(_))
    }

    pub fn job_id(&self) -> Option<DbId> {
        match self {
            PollerState::Polling { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }

    pub fn current_step(&self) -> Option<&str> {
        match self {
            PollerState::Polling { current_step, .. } => current_step.as_deref(),
            _ => None,
        }
    }
}
