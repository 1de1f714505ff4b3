use std::sync::Arc;

use async_trait::async_trait;
use fitcoach_core::jobs::{JobKind, JobOwner};
use fitcoach_core::measurements::ScanMeasurements;
use fitcoach_core::types::DbId;
use fitcoach_db::models::job::Job;
use fitcoach_db::models::scan::Scan;
use fitcoach_db::repositories::ScanRepo;
use fitcoach_db::DbPool;
use fitcoach_generation::ScanExtractor;

use super::commit_with_job;
use crate::processor::{Completion, GenerationFailure, JobHandler, StepReporter};

/// Reads measurements off an uploaded InBody scan image.
///
/// The scan's own `extraction_status` mirrors the job: `completed` with the
/// values filled in, or `failed` with the reason. Once the scan is known,
/// every error path (including a cancel mid-run) leaves it `failed`.
pub struct ScanExtractionHandler {
    pool: DbPool,
    extractor: Arc<dyn ScanExtractor>,
}

impl ScanExtractionHandler {
    pub fn new(pool: DbPool, extractor: Arc<dyn ScanExtractor>) -> Self {
        Self { pool, extractor }
    }

    async fn extract(
        &self,
        scan: &Scan,
        steps: &StepReporter,
    ) -> Result<ScanMeasurements, GenerationFailure> {
        steps.report("Reading scan image…").await;
        let image = tokio::fs::read(&scan.image_path).await?;

        steps.report("Extracting measurements…").await;
        Ok(self.extractor.extract(&image, &scan.image_mime).await?)
    }

    async fn extract_and_record(
        &self,
        job: &Job,
        scan_id: DbId,
        steps: &StepReporter,
    ) -> Result<Completion, GenerationFailure> {
        let scan = ScanRepo::find_by_id(&self.pool, scan_id)
            .await?
            .ok_or_else(|| GenerationFailure::Precondition(format!("Scan {scan_id} no longer exists")))?;

        let measurements = self.extract(&scan, steps).await?;

        let mut tx = self.pool.begin().await?;
        ScanRepo::record_extraction(&mut *tx, scan_id, &measurements).await?;
        let completion = commit_with_job(tx, job.id, Some(scan_id)).await?;

        tracing::info!(
            job_id = job.id,
            scan_id,
            fields = measurements.populated_count(),
            "Scan extracted",
        );
        Ok(completion)
    }
}

#[async_trait]
impl JobHandler for ScanExtractionHandler {
    fn kind(&self) -> JobKind {
        JobKind::ScanExtraction
    }

    async fn run(&self, job: &Job, steps: &StepReporter) -> Result<Completion, GenerationFailure> {
        let scan_id = match job.owner() {
            Ok(JobOwner::ScanExtraction { scan_id }) => scan_id,
            _ => {
                return Err(GenerationFailure::Precondition(format!(
                    "Job {} does not reference a scan",
                    job.id
                )))
            }
        };

        let failure = match self.extract_and_record(job, scan_id, steps).await {
            Ok(completion) => return Ok(completion),
            Err(failure) => failure,
        };

        let reason = match failure {
            GenerationFailure::NoLongerProcessing(_) => "Extraction was cancelled".to_string(),
            ref other => other.to_string(),
        };
        if let Err(e) = ScanRepo::mark_extraction_failed(&self.pool, scan_id, &reason).await {
            tracing::error!(job_id = job.id, scan_id, error = %e, "Failed to mark scan extraction failed");
        }
        Err(failure)
    }
}
