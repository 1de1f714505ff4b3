//! Job Processor.
//!
//! Takes one pending job, claims it with the `pending -> processing` gate,
//! runs the handler registered for its kind and records the outcome. Every
//! handler error and panic ends as `failed` with a readable message; a job
//! is never left in `processing` by a handler failure.
//!
//! Handlers that write artifacts complete their job on the same transaction
//! (see [`Completion::Committed`]), so a job cancelled mid-run never leaves
//! artifacts behind.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use fitcoach_core::jobs::JobKind;
use fitcoach_core::status::JobStatus;
use fitcoach_core::types::DbId;
use fitcoach_db::models::job::Job;
use fitcoach_db::store::{JobStore, JobStoreError};
use fitcoach_generation::GenerationError;
use serde::Serialize;

/// Why a handler could not produce its result.
#[derive(Debug, thiserror::Error)]
pub enum GenerationFailure {
    /// The external service failed; its message is kept verbatim.
    #[error(transparent)]
    Collaborator(#[from] GenerationError),

    /// The job's inputs are missing or no longer valid.
    #[error("{0}")]
    Precondition(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not read stored file: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Processing panicked: {0}")]
    Panicked(String),

    /// The job left `processing` (cancelled) before its result was committed.
    #[error("Job {0} is no longer processing; its result was discarded")]
    NoLongerProcessing(DbId),
}

/// What a handler produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The handler marked the job completed on the transaction that wrote
    /// its artifacts.
    Committed(Option<DbId>),
    /// Nothing was written; the processor marks the job completed.
    Deferred(Option<DbId>),
}

/// Kind-specific work for a claimed job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn kind(&self) -> JobKind;

    /// Do the work and report the produced artifact's id, if any.
    ///
    /// Writes must be committed atomically at the end, together with the
    /// job's completion, so a failure or a cancel leaves nothing behind.
    async fn run(&self, job: &Job, steps: &StepReporter) -> Result<Completion, GenerationFailure>;
}

/// Writes `current_step` for the job being processed.
pub struct StepReporter {
    store: Arc<dyn JobStore>,
    job_id: DbId,
}

impl StepReporter {
    pub fn new(store: Arc<dyn JobStore>, job_id: DbId) -> Self {
        Self { store, job_id }
    }

    /// Record progress text. A failed write is logged and ignored.
    pub async fn report(&self, step: &str) {
        tracing::debug!(job_id = self.job_id, step, "Job step");
        if let Err(e) = self.store.update_step(self.job_id, step).await {
            tracing::warn!(job_id = self.job_id, error = %e, "Failed to record job step");
        }
    }
}

/// Result of [`JobProcessor::process`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProcessOutcome {
    Completed { result_reference: Option<DbId> },
    Failed { message: String },
    /// The job could not be claimed (already claimed or no longer pending).
    Skipped { reason: String },
    /// The job was cancelled while its handler ran; the result was discarded.
    Cancelled,
}

/// Runs jobs through the handler registered for their kind.
pub struct JobProcessor {
    store: Arc<dyn JobStore>,
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
}

impl JobProcessor {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for its kind, replacing any previous one.
    pub fn with_handler<H>(mut self, handler: H) -> Self
    where
        H: JobHandler + 'static,
    {
        self.handlers.insert(handler.kind(), Arc::new(handler));
        self
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Claim and run one job.
    ///
    /// Returns `Err` only for store failures; handler failures are recorded
    /// on the job and reported as [`ProcessOutcome::Failed`].
    pub async fn process(&self, job_id: DbId) -> Result<ProcessOutcome, JobStoreError> {
        let job = match self.store.mark_processing(job_id).await {
            Ok(job) => job,
            Err(JobStoreError::InvalidTransition { from, .. }) => {
                tracing::debug!(job_id, status = %from, "Job not claimable, skipping");
                return Ok(ProcessOutcome::Skipped {
                    reason: format!("job is {from}"),
                });
            }
            Err(e) => return Err(e),
        };

        tracing::info!(job_id, kind = %job.kind, owner_id = job.owner_id, "Processing job");

        let handler = job
            .job_kind()
            .and_then(|kind| self.handlers.get(&kind).cloned());
        let Some(handler) = handler else {
            let message = format!("No processor is available for '{}' jobs", job.kind);
            return self.fail(job_id, message).await;
        };

        let steps = StepReporter::new(self.store.clone(), job_id);
        let result = AssertUnwindSafe(handler.run(&job, &steps))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(GenerationFailure::Panicked(panic_message(&*panic))));

        let result_reference = match result {
            Ok(Completion::Committed(result_reference)) => result_reference,
            Ok(Completion::Deferred(result_reference)) => {
                let completed = self
                    .record(job_id, || self.store.mark_completed(job_id, result_reference))
                    .await;
                if let Err(e) = completed {
                    return self.discard_if_cancelled(job_id, e);
                }
                result_reference
            }
            Err(failure) => return self.fail(job_id, failure.to_string()).await,
        };

        tracing::info!(job_id, ?result_reference, "Job completed");
        Ok(ProcessOutcome::Completed { result_reference })
    }

    async fn fail(&self, job_id: DbId, message: String) -> Result<ProcessOutcome, JobStoreError> {
        tracing::warn!(job_id, error = %message, "Job failed");
        match self.record(job_id, || self.store.mark_failed(job_id, &message)).await {
            Ok(_) => Ok(ProcessOutcome::Failed { message }),
            Err(e) => self.discard_if_cancelled(job_id, e),
        }
    }

    /// Apply a terminal status write, retrying once after a database error.
    ///
    /// A job whose write fails twice stays `processing` until an operator
    /// cancels it; that is logged at error level with the job id.
    async fn record<F, Fut>(&self, job_id: DbId, write: F) -> Result<Job, JobStoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Job, JobStoreError>>,
    {
        match write().await {
            Err(JobStoreError::Database(e)) => {
                tracing::warn!(job_id, error = %e, "Job status write failed, retrying");
                let retried = write().await;
                if let Err(e) = &retried {
                    tracing::error!(
                        job_id,
                        error = %e,
                        "Job stranded in processing; cancel it to release its owner",
                    );
                }
                retried
            }
            other => other,
        }
    }

    /// A job cancelled mid-run keeps its `cancelled` status.
    fn discard_if_cancelled(
        &self,
        job_id: DbId,
        err: JobStoreError,
    ) -> Result<ProcessOutcome, JobStoreError> {
        match err {
            JobStoreError::InvalidTransition {
                from: JobStatus::Cancelled,
                ..
            } => {
                tracing::info!(job_id, "Job was cancelled while processing; result discarded");
                Ok(ProcessOutcome::Cancelled)
            }
            other => Err(other),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
