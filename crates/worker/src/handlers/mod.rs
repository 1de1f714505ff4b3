//! Kind-specific job handlers.

mod recommendation;
mod scan;
mod week;

pub use recommendation::RecommendationHandler;
pub use scan::ScanExtractionHandler;
pub use week::WeekGenerationHandler;

use fitcoach_core::types::DbId;
use fitcoach_db::models::workout::NewWorkout;
use fitcoach_db::repositories::JobRepo;
use fitcoach_generation::GeneratedWorkout;
use sqlx::{Postgres, Transaction};

use crate::processor::{Completion, GenerationFailure};

/// Complete `job_id` on the transaction holding its artifacts and commit
/// both. If the job left `processing` meanwhile, everything rolls back.
async fn commit_with_job(
    mut tx: Transaction<'_, Postgres>,
    job_id: DbId,
    result_reference: Option<DbId>,
) -> Result<Completion, GenerationFailure> {
    if JobRepo::complete(&mut *tx, job_id, result_reference)
        .await?
        .is_none()
    {
        tx.rollback().await?;
        tracing::info!(job_id, "Job no longer processing; artifacts rolled back");
        return Err(GenerationFailure::NoLongerProcessing(job_id));
    }
    tx.commit().await?;
    Ok(Completion::Committed(result_reference))
}

fn to_new_workouts(generated: Vec<GeneratedWorkout>) -> Vec<NewWorkout> {
    generated
        .into_iter()
        .map(|w| NewWorkout {
            session_number: w.session_number,
            name: w.name,
            exercises: w.exercises,
        })
        .collect()
}
