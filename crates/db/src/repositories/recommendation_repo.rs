//! Repository for the `recommendations` table.
//!
//! Recommendations and their workouts are only written by job handlers, a
//! whole week at a time, on the handler's transaction. The handler completes
//! its job on the same transaction, so a failed or cancelled generation
//! never leaves a week behind.

use fitcoach_core::status::RecommendationStatus;
use fitcoach_core::types::{DbId, WeekNumber};
use sqlx::{PgConnection, PgPool};

use crate::models::recommendation::{CreateRecommendation, Recommendation};
use crate::models::workout::{NewWorkout, Workout};
use crate::repositories::WorkoutRepo;

const COLUMNS: &str = "\
    id, client_id, questionnaire_id, status_id, title, current_week, \
    total_weeks, plan_structure, created_at, updated_at";

pub struct RecommendationRepo;

impl RecommendationRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Recommendation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM recommendations WHERE id = $1");
        sqlx::query_as::<_, Recommendation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a draft recommendation at week 1 together with its week-1
    /// workouts. Must run inside the caller's transaction.
    pub async fn create_with_first_week(
        conn: &mut PgConnection,
        input: &CreateRecommendation,
        first_week: &[NewWorkout],
    ) -> Result<(Recommendation, Vec<Workout>), sqlx::Error> {
        let query = format!(
            "INSERT INTO recommendations \
                 (client_id, questionnaire_id, status_id, title, current_week, total_weeks, plan_structure) \
             VALUES ($1, $2, $3, $4, 1, $5, $6) \
             RETURNING {COLUMNS}"
        );
        let recommendation = sqlx::query_as::<_, Recommendation>(&query)
            .bind(input.client_id)
            .bind(input.questionnaire_id)
            .bind(RecommendationStatus::Draft.id())
            .bind(&input.title)
            .bind(input.total_weeks)
            .bind(&input.plan_structure)
            .fetch_one(&mut *conn)
            .await?;

        let workouts = WorkoutRepo::insert_week(conn, recommendation.id, 1, first_week).await?;
        Ok((recommendation, workouts))
    }

    /// Write `target_week`'s workouts and advance `current_week` to it.
    /// Must run inside the caller's transaction.
    ///
    /// The advance is guarded on `current_week = target_week - 1`; if another
    /// writer got there first nothing is written and `None` is returned.
    pub async fn advance_week(
        conn: &mut PgConnection,
        recommendation_id: DbId,
        target_week: WeekNumber,
        workouts: &[NewWorkout],
    ) -> Result<Option<Vec<Workout>>, sqlx::Error> {
        let advanced = sqlx::query(
            "UPDATE recommendations SET current_week = $2 \
             WHERE id = $1 AND current_week = $2 - 1 AND total_weeks >= $2",
        )
        .bind(recommendation_id)
        .bind(target_week)
        .execute(&mut *conn)
        .await?;

        if advanced.rows_affected() == 0 {
            return Ok(None);
        }

        let inserted = WorkoutRepo::insert_week(conn, recommendation_id, target_week, workouts).await?;
        Ok(Some(inserted))
    }
}
