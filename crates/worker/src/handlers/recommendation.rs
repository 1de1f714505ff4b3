use std::sync::Arc;

use async_trait::async_trait;
use fitcoach_core::jobs::{JobKind, JobOwner};
use fitcoach_db::models::job::Job;
use fitcoach_db::models::recommendation::CreateRecommendation;
use fitcoach_db::repositories::{QuestionnaireRepo, RecommendationRepo};
use fitcoach_db::DbPool;
use fitcoach_generation::{QuestionnaireInput, RecommendationGenerator};

use super::{commit_with_job, to_new_workouts};
use crate::processor::{Completion, GenerationFailure, JobHandler, StepReporter};

/// Turns a questionnaire into a draft recommendation with its first week.
///
/// The job's `result_reference` is the new recommendation id.
pub struct RecommendationHandler {
    pool: DbPool,
    generator: Arc<dyn RecommendationGenerator>,
}

impl RecommendationHandler {
    pub fn new(pool: DbPool, generator: Arc<dyn RecommendationGenerator>) -> Self {
        Self { pool, generator }
    }
}

#[async_trait]
impl JobHandler for RecommendationHandler {
    fn kind(&self) -> JobKind {
        JobKind::Recommendation
    }

    async fn run(&self, job: &Job, steps: &StepReporter) -> Result<Completion, GenerationFailure> {
        let questionnaire_id = match job.owner() {
            Ok(JobOwner::Recommendation { questionnaire_id }) => questionnaire_id,
            _ => {
                return Err(GenerationFailure::Precondition(format!(
                    "Job {} does not reference a questionnaire",
                    job.id
                )))
            }
        };

        steps.report("Loading questionnaire…").await;
        let questionnaire = QuestionnaireRepo::find_by_id(&self.pool, questionnaire_id)
            .await?
            .ok_or_else(|| {
                GenerationFailure::Precondition(format!(
                    "Questionnaire {questionnaire_id} no longer exists"
                ))
            })?;

        steps.report("Analyzing questionnaire…").await;
        let plan = self
            .generator
            .generate_recommendation(&QuestionnaireInput {
                questionnaire_id,
                client_id: questionnaire.client_id,
                responses: questionnaire.responses,
            })
            .await?;
        plan.validate()?;

        steps.report("Saving training plan…").await;
        let mut tx = self.pool.begin().await?;
        let (recommendation, workouts) = RecommendationRepo::create_with_first_week(
            &mut tx,
            &CreateRecommendation {
                client_id: questionnaire.client_id,
                questionnaire_id: Some(questionnaire_id),
                title: plan.title,
                total_weeks: plan.total_weeks,
                plan_structure: plan.plan_structure,
            },
            &to_new_workouts(plan.first_week),
        )
        .await?;
        let completion = commit_with_job(tx, job.id, Some(recommendation.id)).await?;

        tracing::info!(
            job_id = job.id,
            questionnaire_id,
            recommendation_id = recommendation.id,
            workouts = workouts.len(),
            "Recommendation created",
        );
        Ok(completion)
    }
}
