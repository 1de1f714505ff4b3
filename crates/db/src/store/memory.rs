use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use fitcoach_core::jobs::{state_machine, truncate_step, JobOwner};
use fitcoach_core::status::JobStatus;
use fitcoach_core::types::DbId;
use tokio::sync::Mutex;

use super::{rejected_transition, JobFilter, JobStore, JobStoreError};
use crate::models::job::{Job, NewJob};
use crate::repositories::job_repo::{DEFAULT_LIMIT, MAX_LIMIT};

/// [`JobStore`] kept in process memory.
///
/// Ids are assigned sequentially from 1, so id order is creation order.
#[derive(Default)]
pub struct InMemoryJobStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    last_id: DbId,
    jobs: BTreeMap<DbId, Job>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a transition under the lock after validating it.
    async fn transition<F>(&self, id: DbId, to: JobStatus, apply: F) -> Result<Job, JobStoreError>
    where
        F: FnOnce(&mut Job) + Send,
    {
        let mut inner = self.inner.lock().await;
        let job = inner.jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        let from = job
            .status()
            .ok_or_else(|| rejected_transition(job, to))?;
        if state_machine::validate_transition(from, to).is_err() {
            return Err(rejected_transition(job, to));
        }
        job.status_id = to.id();
        apply(job);
        job.updated_at = Utc::now();
        Ok(job.clone())
    }
}

fn matches_owner(job: &Job, owner: &JobOwner) -> bool {
    job.kind == owner.kind().as_str()
        && job.owner_id == owner.owner_id()
        && job.target_week == owner.target_week()
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, new: &NewJob) -> Result<Job, JobStoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(active) = inner
            .jobs
            .values()
            .find(|j| matches_owner(j, &new.owner) && j.status().is_some_and(JobStatus::is_active))
        {
            return Err(JobStoreError::Conflict {
                kind: new.owner.kind(),
                owner_id: new.owner.owner_id(),
                existing_job_id: Some(active.id),
            });
        }

        inner.last_id += 1;
        let now = Utc::now();
        let job = Job {
            id: inner.last_id,
            kind: new.owner.kind().as_str().to_string(),
            owner_id: new.owner.owner_id(),
            target_week: new.owner.target_week(),
            status_id: JobStatus::Pending.id(),
            current_step: None,
            result_reference: None,
            error_message: None,
            cancel_reason: None,
            requested_by: new.requested_by,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        };
        inner.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find(&self, id: DbId) -> Result<Option<Job>, JobStoreError> {
        Ok(self.inner.lock().await.jobs.get(&id).cloned())
    }

    async fn latest_for_owner(&self, owner: &JobOwner) -> Result<Option<Job>, JobStoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .jobs
            .values()
            .rev()
            .find(|j| matches_owner(j, owner))
            .cloned())
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<Job>, JobStoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .jobs
            .values()
            .filter(|j| j.status() == Some(JobStatus::Pending))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobStoreError> {
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = filter.offset.unwrap_or(0).max(0);
        let inner = self.inner.lock().await;
        Ok(inner
            .jobs
            .values()
            .rev()
            .filter(|j| filter.kind.map_or(true, |k| j.kind == k.as_str()))
            .filter(|j| filter.status.map_or(true, |s| j.status_id == s.id()))
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_processing(&self, id: DbId) -> Result<Job, JobStoreError> {
        self.transition(id, JobStatus::Processing, |job| {
            job.started_at = Some(Utc::now());
        })
        .await
    }

    async fn update_step(&self, id: DbId, step: &str) -> Result<Job, JobStoreError> {
        let mut inner = self.inner.lock().await;
        let job = inner.jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        if job.status() != Some(JobStatus::Processing) {
            return Err(rejected_transition(job, JobStatus::Processing));
        }
        job.current_step = Some(truncate_step(step));
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn mark_completed(
        &self,
        id: DbId,
        result_reference: Option<DbId>,
    ) -> Result<Job, JobStoreError> {
        self.transition(id, JobStatus::Completed, |job| {
            job.result_reference = result_reference;
            job.completed_at = Some(Utc::now());
        })
        .await
    }

    async fn mark_failed(&self, id: DbId, error_message: &str) -> Result<Job, JobStoreError> {
        let message = error_message.to_string();
        self.transition(id, JobStatus::Failed, |job| {
            job.error_message = Some(message);
            job.completed_at = Some(Utc::now());
        })
        .await
    }

    async fn cancel(&self, id: DbId, reason: Option<&str>) -> Result<Job, JobStoreError> {
        let reason = reason.map(str::to_string);
        self.transition(id, JobStatus::Cancelled, |job| {
            job.cancel_reason = reason;
            job.completed_at = Some(Utc::now());
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use fitcoach_core::jobs::JobKind;

    use super::*;

    fn questionnaire(id: DbId) -> NewJob {
        NewJob::new(JobOwner::Recommendation {
            questionnaire_id: id,
        })
    }

    fn week(recommendation_id: DbId, week_number: i16) -> NewJob {
        NewJob::new(JobOwner::WeekGeneration {
            recommendation_id,
            week_number,
        })
    }

    #[tokio::test]
    async fn create_starts_pending() {
        let store = InMemoryJobStore::new();
        let job = store.create(&questionnaire(42)).await.unwrap();
        assert_eq!(job.status(), Some(JobStatus::Pending));
        assert_eq!(job.owner_id, 42);
        assert!(job.started_at.is_none());
    }

    #[tokio::test]
    async fn second_active_job_for_owner_conflicts() {
        let store = InMemoryJobStore::new();
        let first = store.create(&questionnaire(42)).await.unwrap();
        assert_matches!(
            store.create(&questionnaire(42)).await,
            Err(JobStoreError::Conflict { existing_job_id: Some(id), .. }) if id == first.id
        );
    }

    #[tokio::test]
    async fn different_weeks_are_different_owners() {
        let store = InMemoryJobStore::new();
        store.create(&week(9, 2)).await.unwrap();
        assert!(store.create(&week(9, 3)).await.is_ok());
    }

    #[tokio::test]
    async fn new_job_allowed_after_terminal() {
        let store = InMemoryJobStore::new();
        let job = store.create(&questionnaire(42)).await.unwrap();
        store.mark_processing(job.id).await.unwrap();
        store.mark_failed(job.id, "model timed out").await.unwrap();
        assert!(store.create(&questionnaire(42)).await.is_ok());
    }

    #[tokio::test]
    async fn full_lifecycle_sets_timestamps() {
        let store = InMemoryJobStore::new();
        let job = store.create(&questionnaire(1)).await.unwrap();
        let job = store.mark_processing(job.id).await.unwrap();
        assert!(job.started_at.is_some());
        let job = store.update_step(job.id, "Analyzing questionnaire…").await.unwrap();
        assert_eq!(job.current_step.as_deref(), Some("Analyzing questionnaire…"));
        let job = store.mark_completed(job.id, Some(11)).await.unwrap();
        assert_eq!(job.status(), Some(JobStatus::Completed));
        assert_eq!(job.result_reference, Some(11));
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn mark_processing_is_exclusive() {
        let store = InMemoryJobStore::new();
        let job = store.create(&questionnaire(1)).await.unwrap();
        store.mark_processing(job.id).await.unwrap();
        assert_matches!(
            store.mark_processing(job.id).await,
            Err(JobStoreError::InvalidTransition {
                from: JobStatus::Processing,
                to: JobStatus::Processing,
                ..
            })
        );
    }

    #[tokio::test]
    async fn terminal_jobs_never_change() {
        let store = InMemoryJobStore::new();
        let job = store.create(&questionnaire(1)).await.unwrap();
        store.mark_processing(job.id).await.unwrap();
        store.mark_completed(job.id, Some(3)).await.unwrap();

        assert_matches!(
            store.mark_processing(job.id).await,
            Err(JobStoreError::InvalidTransition { from: JobStatus::Completed, .. })
        );
        assert_matches!(
            store.cancel(job.id, None).await,
            Err(JobStoreError::InvalidTransition { .. })
        );
        assert_matches!(
            store.update_step(job.id, "late").await,
            Err(JobStoreError::InvalidTransition { .. })
        );
    }

    #[tokio::test]
    async fn pending_cannot_complete_directly() {
        let store = InMemoryJobStore::new();
        let job = store.create(&questionnaire(1)).await.unwrap();
        assert_matches!(
            store.mark_completed(job.id, None).await,
            Err(JobStoreError::InvalidTransition { from: JobStatus::Pending, to: JobStatus::Completed, .. })
        );
    }

    #[tokio::test]
    async fn cancel_records_reason() {
        let store = InMemoryJobStore::new();
        let job = store.create(&questionnaire(1)).await.unwrap();
        let job = store.cancel(job.id, Some("wrong questionnaire")).await.unwrap();
        assert_eq!(job.status(), Some(JobStatus::Cancelled));
        assert_eq!(job.cancel_reason.as_deref(), Some("wrong questionnaire"));
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let store = InMemoryJobStore::new();
        assert_matches!(store.mark_processing(99).await, Err(JobStoreError::NotFound(99)));
    }

    #[tokio::test]
    async fn pending_listed_oldest_first() {
        let store = InMemoryJobStore::new();
        let a = store.create(&questionnaire(1)).await.unwrap();
        let b = store.create(&questionnaire(2)).await.unwrap();
        let c = store.create(&questionnaire(3)).await.unwrap();
        store.mark_processing(b.id).await.unwrap();

        let pending: Vec<_> = store.list_pending(10).await.unwrap().iter().map(|j| j.id).collect();
        assert_eq!(pending, vec![a.id, c.id]);
        assert_eq!(store.list_pending(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn latest_for_owner_returns_newest() {
        let store = InMemoryJobStore::new();
        let owner = JobOwner::ScanExtraction { scan_id: 5 };
        let first = store.create(&NewJob::new(owner)).await.unwrap();
        store.cancel(first.id, None).await.unwrap();
        let second = store.create(&NewJob::new(owner)).await.unwrap();

        let latest = store.latest_for_owner(&owner).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert!(store
            .latest_for_owner(&JobOwner::ScanExtraction { scan_id: 6 })
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn list_filters_by_kind_and_status() {
        let store = InMemoryJobStore::new();
        store.create(&questionnaire(1)).await.unwrap();
        let w = store.create(&week(4, 2)).await.unwrap();
        store.mark_processing(w.id).await.unwrap();

        let filter = JobFilter {
            kind: Some(JobKind::WeekGeneration),
            status: Some(JobStatus::Processing),
            ..Default::default()
        };
        let jobs = store.list(&filter).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, w.id);
    }
}
