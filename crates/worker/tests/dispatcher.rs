//! Dispatcher sweeps against the in-memory job store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fitcoach_core::jobs::{JobKind, JobOwner};
use fitcoach_core::status::JobStatus;
use fitcoach_core::types::DbId;
use fitcoach_db::models::job::{Job, JobView, NewJob};
use fitcoach_db::store::{InMemoryJobStore, JobStore};
use fitcoach_generation::GenerationError;
use fitcoach_worker::dispatcher::{DispatcherConfig, JobDispatcher, SweepReport};
use fitcoach_worker::processor::{
    Completion, GenerationFailure, JobHandler, JobProcessor, StepReporter,
};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fake recommendation generator: fails for the listed questionnaires and
/// otherwise "creates" recommendation `1000 + questionnaire_id`.
#[derive(Clone, Default)]
struct FakeRecommendations {
    failing: Vec<DbId>,
    delay: Option<Duration>,
    runs: Arc<Mutex<Vec<DbId>>>,
}

impl FakeRecommendations {
    fn runs(&self) -> Vec<DbId> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobHandler for FakeRecommendations {
    fn kind(&self) -> JobKind {
        JobKind::Recommendation
    }

    async fn run(&self, job: &Job, steps: &StepReporter) -> Result<Completion, GenerationFailure> {
        self.runs.lock().unwrap().push(job.id);
        steps.report("Analyzing questionnaire…").await;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(&job.owner_id) {
            return Err(GenerationError::Unusable("plan had no sessions".to_string()).into());
        }
        Ok(Completion::Deferred(Some(1000 + job.owner_id)))
    }
}

fn recommendation_job(questionnaire_id: DbId) -> NewJob {
    NewJob::new(JobOwner::Recommendation { questionnaire_id })
}

fn dispatcher(
    store: Arc<InMemoryJobStore>,
    handler: FakeRecommendations,
    config: DispatcherConfig,
) -> JobDispatcher {
    let processor = JobProcessor::new(store).with_handler(handler);
    JobDispatcher::new(Arc::new(processor), config)
}

async fn status_of(store: &InMemoryJobStore, id: DbId) -> JobStatus {
    store.find(id).await.unwrap().unwrap().status().unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_job_does_not_stop_the_sweep() {
    let store = Arc::new(InMemoryJobStore::new());
    let mut ids = Vec::new();
    for questionnaire_id in 1..=5 {
        ids.push(store.create(&recommendation_job(questionnaire_id)).await.unwrap().id);
    }
    let handler = FakeRecommendations {
        failing: vec![2],
        ..Default::default()
    };
    let dispatcher = dispatcher(store.clone(), handler.clone(), DispatcherConfig::default());

    let report = dispatcher.sweep().await.unwrap();

    assert_eq!(
        report,
        SweepReport {
            found: 5,
            completed: 4,
            failed: 1,
            skipped: 0,
            errored: 0,
        }
    );
    assert_eq!(report.processed(), 4);
    assert_eq!(handler.runs(), ids);
    assert_eq!(status_of(&store, ids[1]).await, JobStatus::Failed);
    for id in [ids[2], ids[3], ids[4]] {
        assert_eq!(status_of(&store, id).await, JobStatus::Completed);
    }

    let failed = store.find(ids[1]).await.unwrap().unwrap();
    assert_eq!(
        failed.error_message.as_deref(),
        Some("Unusable result: plan had no sessions")
    );
}

#[tokio::test]
async fn questionnaire_42_becomes_job_7_and_completes() {
    let store = Arc::new(InMemoryJobStore::new());
    // Six earlier jobs, all finished, so the next id is 7.
    for questionnaire_id in 1..=6 {
        let job = store.create(&recommendation_job(questionnaire_id)).await.unwrap();
        store.cancel(job.id, None).await.unwrap();
    }
    let owner = JobOwner::Recommendation { questionnaire_id: 42 };
    assert!(store.latest_for_owner(&owner).await.unwrap().is_none());

    let job = store.create(&NewJob::new(owner)).await.unwrap();
    assert_eq!(job.id, 7);

    let handler = FakeRecommendations::default();
    let report = dispatcher(store.clone(), handler, DispatcherConfig::default())
        .sweep()
        .await
        .unwrap();
    assert_eq!(report.found, 1);
    assert_eq!(report.completed, 1);

    let view = JobView::try_from(&store.find(7).await.unwrap().unwrap()).unwrap();
    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.result_reference, Some(1042));
    assert_eq!(view.error_message, None);
}

#[tokio::test]
async fn sweep_takes_oldest_batch_first() {
    let store = Arc::new(InMemoryJobStore::new());
    let mut ids = Vec::new();
    for questionnaire_id in 1..=4 {
        ids.push(store.create(&recommendation_job(questionnaire_id)).await.unwrap().id);
    }
    let handler = FakeRecommendations::default();
    let dispatcher = dispatcher(
        store.clone(),
        handler.clone(),
        DispatcherConfig {
            batch_size: 2,
            ..Default::default()
        },
    );

    let first = dispatcher.sweep().await.unwrap();
    assert_eq!(first.found, 2);
    assert_eq!(handler.runs(), ids[..2].to_vec());

    let second = dispatcher.sweep().await.unwrap();
    assert_eq!(second.found, 2);
    assert_eq!(handler.runs(), ids);

    assert_eq!(dispatcher.sweep().await.unwrap(), SweepReport::default());
}

#[tokio::test]
async fn overlapping_sweeps_run_each_job_once() {
    let store = Arc::new(InMemoryJobStore::new());
    for questionnaire_id in 1..=4 {
        store.create(&recommendation_job(questionnaire_id)).await.unwrap();
    }
    let handler = FakeRecommendations {
        delay: Some(Duration::from_millis(5)),
        ..Default::default()
    };
    let processor = Arc::new(JobProcessor::new(store.clone()).with_handler(handler.clone()));
    let a = JobDispatcher::new(processor.clone(), DispatcherConfig::default());
    let b = JobDispatcher::new(processor, DispatcherConfig::default());

    let (ra, rb) = tokio::join!(a.sweep(), b.sweep());
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    assert_eq!(ra.completed + rb.completed, 4);
    let mut per_job: HashMap<DbId, usize> = HashMap::new();
    for id in handler.runs() {
        *per_job.entry(id).or_default() += 1;
    }
    assert_eq!(per_job.len(), 4);
    assert!(per_job.values().all(|runs| *runs == 1));
}

#[tokio::test]
async fn cancelled_jobs_are_not_picked_up() {
    let store = Arc::new(InMemoryJobStore::new());
    let job = store.create(&recommendation_job(1)).await.unwrap();
    store.cancel(job.id, Some("created by mistake")).await.unwrap();

    let handler = FakeRecommendations::default();
    let report = dispatcher(store, handler.clone(), DispatcherConfig::default())
        .sweep()
        .await
        .unwrap();
    assert_eq!(report.found, 0);
    assert!(handler.runs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn run_loop_sweeps_until_cancelled() {
    let store = Arc::new(InMemoryJobStore::new());
    let first = store.create(&recommendation_job(1)).await.unwrap();
    let handler = FakeRecommendations::default();
    let dispatcher = Arc::new(dispatcher(
        store.clone(),
        handler,
        DispatcherConfig {
            interval: Duration::from_secs(60),
            batch_size: 25,
        },
    ));

    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let dispatcher = dispatcher.clone();
        let cancel = cancel.clone();
        async move { dispatcher.run(cancel).await }
    });

    // The first tick fires immediately.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(status_of(&store, first.id).await, JobStatus::Completed);

    // A job created later waits for the next tick.
    let second = store.create(&recommendation_job(2)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(status_of(&store, second.id).await, JobStatus::Pending);
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(status_of(&store, second.id).await, JobStatus::Completed);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn spawned_sweep_finishes_after_caller_is_gone() {
    let store = Arc::new(InMemoryJobStore::new());
    let job = store.create(&recommendation_job(1)).await.unwrap();
    let handler = FakeRecommendations {
        delay: Some(Duration::from_secs(120)),
        ..Default::default()
    };
    let dispatcher = Arc::new(dispatcher(store.clone(), handler, DispatcherConfig::default()));

    // The returned handle is dropped at once; the sweep keeps running.
    drop(dispatcher.spawn_sweep().expect("no sweep running"));

    tokio::time::sleep(Duration::from_secs(121)).await;
    assert_eq!(status_of(&store, job.id).await, JobStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn spawn_sweep_is_single_flight() {
    let store = Arc::new(InMemoryJobStore::new());
    let first = store.create(&recommendation_job(1)).await.unwrap();
    let handler = FakeRecommendations {
        delay: Some(Duration::from_secs(60)),
        ..Default::default()
    };
    let dispatcher = Arc::new(dispatcher(store.clone(), handler.clone(), DispatcherConfig::default()));

    let running = dispatcher.spawn_sweep().expect("no sweep running");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(dispatcher.spawn_sweep().is_none());

    let report = running.await.unwrap().unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(handler.runs(), vec![first.id]);

    // Once the first sweep is done a new one may start.
    let again = dispatcher.spawn_sweep().expect("previous sweep finished");
    assert_eq!(again.await.unwrap().unwrap().found, 0);
}
