//! Repository for the `workouts` table.

use fitcoach_core::status::{StatusId, WorkoutStatus};
use fitcoach_core::types::{DbId, WeekNumber};
use sqlx::{PgConnection, PgPool};

use crate::models::workout::{NewWorkout, Workout};

const COLUMNS: &str = "\
    id, recommendation_id, week_number, session_number, name, exercises, \
    status_id, created_at, updated_at";

pub struct WorkoutRepo;

impl WorkoutRepo {
    /// All workouts of one program week, in session order.
    pub async fn list_for_week(
        pool: &PgPool,
        recommendation_id: DbId,
        week_number: WeekNumber,
    ) -> Result<Vec<Workout>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workouts \
             WHERE recommendation_id = $1 AND week_number = $2 \
             ORDER BY session_number ASC"
        );
        sqlx::query_as::<_, Workout>(&query)
            .bind(recommendation_id)
            .bind(week_number)
            .fetch_all(pool)
            .await
    }

    /// Status ids of every workout in a week, read fresh for the
    /// week-completion gate.
    pub async fn week_status_ids(
        pool: &PgPool,
        recommendation_id: DbId,
        week_number: WeekNumber,
    ) -> Result<Vec<StatusId>, sqlx::Error> {
        sqlx::query_scalar::<_, StatusId>(
            "SELECT status_id FROM workouts \
             WHERE recommendation_id = $1 AND week_number = $2",
        )
        .bind(recommendation_id)
        .bind(week_number)
        .fetch_all(pool)
        .await
    }

    /// Count workouts already written for a week.
    pub async fn count_for_week(
        pool: &PgPool,
        recommendation_id: DbId,
        week_number: WeekNumber,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM workouts \
             WHERE recommendation_id = $1 AND week_number = $2",
        )
        .bind(recommendation_id)
        .bind(week_number)
        .fetch_one(pool)
        .await
    }

    /// Set a workout's status (trainer marks a session done or skipped).
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: WorkoutStatus,
    ) -> Result<Option<Workout>, sqlx::Error> {
        let query = format!(
            "UPDATE workouts SET status_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Workout>(&query)
            .bind(id)
            .bind(status.id())
            .fetch_optional(pool)
            .await
    }

    /// Insert a whole week inside the caller's transaction.
    pub(crate) async fn insert_week(
        conn: &mut PgConnection,
        recommendation_id: DbId,
        week_number: WeekNumber,
        workouts: &[NewWorkout],
    ) -> Result<Vec<Workout>, sqlx::Error> {
        let query = format!(
            "INSERT INTO workouts \
                 (recommendation_id, week_number, session_number, name, exercises, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        let mut inserted = Vec::with_capacity(workouts.len());
        for workout in workouts {
            let row = sqlx::query_as::<_, Workout>(&query)
                .bind(recommendation_id)
                .bind(week_number)
                .bind(workout.session_number)
                .bind(&workout.name)
                .bind(&workout.exercises)
                .bind(WorkoutStatus::Scheduled.id())
                .fetch_one(&mut *conn)
                .await?;
            inserted.push(row);
        }
        Ok(inserted)
    }
}
