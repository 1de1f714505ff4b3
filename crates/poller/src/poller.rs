//! Follows one owner's job until it finishes.
//!
//! Each tick is one awaited status request, so two polls for the same job
//! are never in flight at once. The interval is fixed per job kind; there
//! is no backoff. Cancelling the token only stops this client from
//! watching. The server keeps processing, and [`JobPoller::resume`] picks
//! the job up again later.

use std::sync::Arc;
use std::time::Duration;

use fitcoach_core::jobs::JobOwner;
use fitcoach_core::polling::MAX_CONSECUTIVE_POLL_FAILURES;
use fitcoach_core::types::DbId;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::api::{JobApi, JobSnapshot};
use crate::error::PollError;
use crate::state::PollerState;

pub struct JobPoller {
    api: Arc<dyn JobApi>,
    owner: JobOwner,
    interval: Duration,
    max_failures: u32,
    state: watch::Sender<PollerState>,
}

impl JobPoller {
    /// Poll at the cadence of the owner's job kind.
    pub fn new(api: Arc<dyn JobApi>, owner: JobOwner) -> Self {
        let (state, _) = watch::channel(PollerState::Idle);
        Self {
            api,
            interval: owner.kind().poll_interval(),
            owner,
            max_failures: MAX_CONSECUTIVE_POLL_FAILURES,
            state,
        }
    }

    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures.max(1);
        self
    }

    pub fn owner(&self) -> &JobOwner {
        &self.owner
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Receive every state change, e.g. to render `current_step`.
    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PollerState {
        self.state.borrow().clone()
    }

    /// Start a job for the owner and follow it.
    ///
    /// When the owner already has an active job, that job is followed
    /// instead. Other start errors are returned and the poller stays idle.
    pub async fn start(&self, cancel: CancellationToken) -> Result<PollerState, PollError> {
        match self.api.start(&self.owner).await {
            Ok(job) => {
                tracing::debug!(job_id = job.id, kind = %job.kind, "Job started");
                Ok(self.follow(job, cancel).await)
            }
            Err(PollError::Conflict { job_id: Some(job_id) }) => {
                tracing::debug!(job_id, "Job already active, resuming");
                Ok(self.poll(job_id, cancel).await)
            }
            Err(PollError::Conflict { job_id: None }) => self.resume(cancel).await,
            Err(e) => Err(e),
        }
    }

    /// Pick up the owner's latest job, e.g. after a page reload.
    ///
    /// An active job is followed; a finished one is surfaced immediately
    /// without polling; no job at all leaves the poller idle.
    pub async fn resume(&self, cancel: CancellationToken) -> Result<PollerState, PollError> {
        match self.api.latest_job(&self.owner).await? {
            Some(job) => Ok(self.follow(job, cancel).await),
            None => {
                self.publish(PollerState::Idle);
                Ok(PollerState::Idle)
            }
        }
    }

    /// Follow a known job id, checking its status right away.
    pub async fn poll(&self, job_id: DbId, cancel: CancellationToken) -> PollerState {
        self.publish(PollerState::Polling {
            job_id,
            current_step: None,
            consecutive_failures: 0,
        });
        self.run(job_id, false, cancel).await
    }

    async fn follow(&self, job: JobSnapshot, cancel: CancellationToken) -> PollerState {
        let state = PollerState::observe(&job);
        self.publish(state.clone());
        if state.is_terminal() {
            return state;
        }
        self.run(job.id, true, cancel).await
    }

    /// Tick until the job is terminal or `cancel` fires; returns the last
    /// state.
    async fn run(&self, job_id: DbId, mut wait_first: bool, cancel: CancellationToken) -> PollerState {
        loop {
            if wait_first {
                tokio::select! {
                    _ = cancel.cancelled() => return self.state(),
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
            wait_first = true;

            let result = tokio::select! {
                _ = cancel.cancelled() => return self.state(),
                result = self.api.job_status(job_id) => result,
            };

            let next = match result {
                Ok(job) => PollerState::observe(&job),
                Err(e) => {
                    tracing::warn!(job_id, error = %e, "Job status request failed");
                    self.state().record_failure(&e, self.max_failures)
                }
            };
            self.publish(next.clone());
            if next.is_terminal() {
                tracing::debug!(job_id, state = ?next, "Stopped polling");
                return next;
            }
        }
    }

    fn publish(&self, state: PollerState) {
        self.state.send_replace(state);
    }
}
