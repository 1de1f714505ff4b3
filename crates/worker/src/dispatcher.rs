//! Job Dispatcher.
//!
//! A sweep fetches pending jobs oldest-first and hands them to the
//! [`JobProcessor`] one at a time, so at most one external generation call
//! is in flight per dispatcher. A job that fails, or whose store writes
//! fail, is logged and counted; the sweep always moves on to the next job.
//!
//! Within one dispatcher sweeps never overlap. Sweeps from different
//! processes are still safe: the processor's `pending -> processing` gate
//! lets only one of them run a job.

use std::sync::Arc;
use std::time::Duration;

use fitcoach_db::store::JobStoreError;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::processor::{JobProcessor, ProcessOutcome};

/// Sweep settings.
///
/// | Env var                  | Default |
/// |--------------------------|---------|
/// | `DISPATCH_INTERVAL_SECS` | `60`    |
/// | `DISPATCH_BATCH_SIZE`    | `25`    |
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub interval: Duration,
    pub batch_size: i64,
}

const DEFAULT_INTERVAL_SECS: u64 = 60;
const DEFAULT_BATCH_SIZE: i64 = 25;

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl DispatcherConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable or non-positive values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let interval_secs = lookup("DISPATCH_INTERVAL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        let batch_size = lookup("DISPATCH_BATCH_SIZE")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_BATCH_SIZE);

        Self {
            interval: Duration::from_secs(interval_secs),
            batch_size,
        }
    }
}

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Pending jobs fetched.
    pub found: usize,
    pub completed: usize,
    pub failed: usize,
    /// Claimed elsewhere first, or cancelled mid-run.
    pub skipped: usize,
    /// Store errors while processing a job.
    pub errored: usize,
}

impl SweepReport {
    /// Jobs that ran to a successful completion.
    pub fn processed(&self) -> usize {
        self.completed
    }
}

pub struct JobDispatcher {
    processor: Arc<JobProcessor>,
    config: DispatcherConfig,
    /// Held for the duration of a sweep.
    sweeping: Arc<Mutex<()>>,
}

impl JobDispatcher {
    pub fn new(processor: Arc<JobProcessor>, config: DispatcherConfig) -> Self {
        Self {
            processor,
            config,
            sweeping: Arc::new(Mutex::new(())),
        }
    }

    /// Start a sweep on its own task unless one is already running.
    ///
    /// The sweep runs to completion even if the caller goes away (a request
    /// timeout or a client disconnect), so a claimed job is always finished.
    /// Returns `None` when a sweep is already in progress.
    pub fn spawn_sweep(self: &Arc<Self>) -> Option<JoinHandle<Result<SweepReport, JobStoreError>>> {
        let guard = Arc::clone(&self.sweeping).try_lock_owned().ok()?;
        let dispatcher = Arc::clone(self);
        Some(tokio::spawn(async move {
            let _guard = guard;
            let result = dispatcher.sweep_unlocked().await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "Background dispatch sweep failed");
            }
            result
        }))
    }

    /// Process up to `batch_size` pending jobs, oldest first.
    ///
    /// Waits for any sweep already in progress. Fails only when the pending
    /// list itself cannot be read.
    pub async fn sweep(&self) -> Result<SweepReport, JobStoreError> {
        let _guard = self.sweeping.lock().await;
        self.sweep_unlocked().await
    }

    async fn sweep_unlocked(&self) -> Result<SweepReport, JobStoreError> {
        let pending = self
            .processor
            .store()
            .list_pending(self.config.batch_size)
            .await?;

        let mut report = SweepReport {
            found: pending.len(),
            ..Default::default()
        };

        for job in pending {
            match self.processor.process(job.id).await {
                Ok(ProcessOutcome::Completed { .. }) => report.completed += 1,
                Ok(ProcessOutcome::Failed { .. }) => report.failed += 1,
                Ok(ProcessOutcome::Skipped { .. } | ProcessOutcome::Cancelled) => {
                    report.skipped += 1
                }
                Err(e) => {
                    report.errored += 1;
                    tracing::error!(job_id = job.id, kind = %job.kind, error = %e, "Job processing error");
                }
            }
        }

        if report.found > 0 {
            tracing::info!(
                found = report.found,
                completed = report.completed,
                failed = report.failed,
                skipped = report.skipped,
                errored = report.errored,
                "Dispatch sweep finished",
            );
        }
        Ok(report)
    }

    /// Sweep on every interval tick until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "Job dispatcher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Job dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        tracing::error!(error = %e, "Dispatch sweep failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_defaults() {
        let config = DispatcherConfig::from_lookup(lookup(&[]));
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.batch_size, 25);
    }

    #[test]
    fn config_overrides() {
        let config = DispatcherConfig::from_lookup(lookup(&[
            ("DISPATCH_INTERVAL_SECS", "5"),
            ("DISPATCH_BATCH_SIZE", "3"),
        ]));
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.batch_size, 3);
    }

    #[test]
    fn config_rejects_zero_and_garbage() {
        let config = DispatcherConfig::from_lookup(lookup(&[
            ("DISPATCH_INTERVAL_SECS", "0"),
            ("DISPATCH_BATCH_SIZE", "lots"),
        ]));
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.batch_size, 25);
    }
}
