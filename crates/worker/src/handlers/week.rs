use std::sync::Arc;

use async_trait::async_trait;
use fitcoach_core::jobs::{JobKind, JobOwner};
use fitcoach_core::status::WorkoutStatus;
use fitcoach_db::models::job::Job;
use fitcoach_db::repositories::{RecommendationRepo, WorkoutRepo};
use fitcoach_db::DbPool;
use fitcoach_generation::types::validate_week;
use fitcoach_generation::{PreviousWorkout, WeekGenerator, WeekRequest};

use super::{commit_with_job, to_new_workouts};
use crate::processor::{Completion, GenerationFailure, JobHandler, StepReporter};

/// Generates the next week of a running program.
///
/// Whether the current week is complete was checked when the job was
/// created; here only the week ordering is re-checked against a fresh read
/// of the recommendation. Week jobs carry no `result_reference`.
pub struct WeekGenerationHandler {
    pool: DbPool,
    generator: Arc<dyn WeekGenerator>,
}

impl WeekGenerationHandler {
    pub fn new(pool: DbPool, generator: Arc<dyn WeekGenerator>) -> Self {
        Self { pool, generator }
    }
}

#[async_trait]
impl JobHandler for WeekGenerationHandler {
    fn kind(&self) -> JobKind {
        JobKind::WeekGeneration
    }

    async fn run(&self, job: &Job, steps: &StepReporter) -> Result<Completion, GenerationFailure> {
        let (recommendation_id, target_week) = match job.owner() {
            Ok(JobOwner::WeekGeneration {
                recommendation_id,
                week_number,
            }) => (recommendation_id, week_number),
            _ => {
                return Err(GenerationFailure::Precondition(format!(
                    "Job {} does not reference a program week",
                    job.id
                )))
            }
        };

        let recommendation = RecommendationRepo::find_by_id(&self.pool, recommendation_id)
            .await?
            .ok_or_else(|| {
                GenerationFailure::Precondition(format!(
                    "Recommendation {recommendation_id} no longer exists"
                ))
            })?;

        if target_week != recommendation.current_week + 1 {
            return Err(GenerationFailure::Precondition(format!(
                "Week {target_week} cannot be generated; the program is on week {}",
                recommendation.current_week
            )));
        }
        if target_week > recommendation.total_weeks {
            return Err(GenerationFailure::Precondition(format!(
                "Week {target_week} is beyond the {}-week program",
                recommendation.total_weeks
            )));
        }

        steps
            .report(&format!("Reviewing week {}…", recommendation.current_week))
            .await;
        let previous_week =
            WorkoutRepo::list_for_week(&self.pool, recommendation_id, recommendation.current_week)
                .await?
                .into_iter()
                .map(|w| PreviousWorkout {
                    session_number: w.session_number,
                    status: w.status().unwrap_or(WorkoutStatus::Scheduled),
                    name: w.name,
                })
                .collect();

        steps.report(&format!("Generating week {target_week}…")).await;
        let generated = self
            .generator
            .generate_week(&WeekRequest {
                recommendation_id,
                title: recommendation.title,
                plan_structure: recommendation.plan_structure,
                target_week,
                total_weeks: recommendation.total_weeks,
                previous_week,
            })
            .await?;
        validate_week(&generated)?;

        steps.report(&format!("Saving week {target_week} workouts…")).await;
        let mut tx = self.pool.begin().await?;
        let inserted = RecommendationRepo::advance_week(
            &mut tx,
            recommendation_id,
            target_week,
            &to_new_workouts(generated),
        )
        .await?
        .ok_or_else(|| {
            GenerationFailure::Precondition(format!(
                "Week {target_week} was generated by another job in the meantime"
            ))
        })?;
        let completion = commit_with_job(tx, job.id, None).await?;

        tracing::info!(
            job_id = job.id,
            recommendation_id,
            week = target_week,
            workouts = inserted.len(),
            "Week generated",
        );
        Ok(completion)
    }
}
