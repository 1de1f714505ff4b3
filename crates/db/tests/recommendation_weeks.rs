//! Integration tests for recommendation/week writes and scan updates.

use fitcoach_core::measurements::ScanMeasurements;
use fitcoach_core::status::{ScanExtractionStatus, WorkoutStatus};
use fitcoach_core::week_gate;
use fitcoach_db::models::client::CreateClient;
use fitcoach_db::models::questionnaire::CreateQuestionnaire;
use fitcoach_db::models::recommendation::{CreateRecommendation, Recommendation};
use fitcoach_db::models::scan::CreateScan;
use fitcoach_db::models::workout::{NewWorkout, Workout};
use fitcoach_db::repositories::{
    ClientRepo, QuestionnaireRepo, RecommendationRepo, ScanRepo, WorkoutRepo,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sessions(count: i16) -> Vec<NewWorkout> {
    (1..=count)
        .map(|n| NewWorkout {
            session_number: n,
            name: format!("Session {n}"),
            exercises: json!([{ "name": "Squat", "sets": 3, "reps": 8 }]),
        })
        .collect()
}

async fn seed_recommendation(pool: &PgPool, total_weeks: i16) -> Recommendation {
    let client = ClientRepo::create(
        pool,
        &CreateClient {
            trainer_id: 1,
            name: "Dana".to_string(),
        },
    )
    .await
    .unwrap();
    let questionnaire = QuestionnaireRepo::create(
        pool,
        &CreateQuestionnaire {
            client_id: client.id,
            responses: json!({ "goal": "strength" }),
        },
    )
    .await
    .unwrap();
    let mut tx = pool.begin().await.unwrap();
    let (rec, _) = RecommendationRepo::create_with_first_week(
        &mut tx,
        &CreateRecommendation {
            client_id: client.id,
            questionnaire_id: Some(questionnaire.id),
            title: "Strength foundations".to_string(),
            total_weeks,
            plan_structure: json!({ "phases": ["base", "build"] }),
        },
        &sessions(3),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    rec
}

/// Advance inside a transaction the way the week handler does: commit only
/// when the guarded update took, roll back otherwise.
async fn advance(
    pool: &PgPool,
    rec_id: i64,
    target_week: i16,
    workouts: &[NewWorkout],
) -> Result<Option<Vec<Workout>>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let inserted = RecommendationRepo::advance_week(&mut tx, rec_id, target_week, workouts).await?;
    if inserted.is_some() {
        tx.commit().await?;
    }
    Ok(inserted)
}

async fn week_status(pool: &PgPool, rec_id: i64, week: i16) -> week_gate::WeekStatus {
    let ids = WorkoutRepo::week_status_ids(pool, rec_id, week).await.unwrap();
    week_gate::evaluate(ids.into_iter().filter_map(WorkoutStatus::from_id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn first_week_written_with_recommendation(pool: PgPool) {
    let rec = seed_recommendation(&pool, 6).await;
    assert_eq!(rec.current_week, 1);

    let week = WorkoutRepo::list_for_week(&pool, rec.id, 1).await.unwrap();
    assert_eq!(week.len(), 3);
    assert!(week.iter().all(|w| w.status() == Some(WorkoutStatus::Scheduled)));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn week_status_counts_from_fresh_rows(pool: PgPool) {
    let rec = seed_recommendation(&pool, 6).await;
    let week = WorkoutRepo::list_for_week(&pool, rec.id, 1).await.unwrap();

    WorkoutRepo::update_status(&pool, week[0].id, WorkoutStatus::Completed).await.unwrap();
    WorkoutRepo::update_status(&pool, week[1].id, WorkoutStatus::Skipped).await.unwrap();
    let status = week_status(&pool, rec.id, 1).await;
    assert!(!status.is_complete);
    assert_eq!(status.scheduled, 1);

    WorkoutRepo::update_status(&pool, week[2].id, WorkoutStatus::Completed).await.unwrap();
    let status = week_status(&pool, rec.id, 1).await;
    assert!(status.is_complete);
    assert_eq!((status.total, status.completed, status.skipped), (3, 2, 1));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn advance_week_inserts_and_moves_current_week(pool: PgPool) {
    let rec = seed_recommendation(&pool, 6).await;

    let inserted = advance(&pool, rec.id, 2, &sessions(4))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(inserted.len(), 4);
    assert!(inserted.iter().all(|w| w.week_number == 2));

    let rec = RecommendationRepo::find_by_id(&pool, rec.id).await.unwrap().unwrap();
    assert_eq!(rec.current_week, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn advance_week_out_of_order_writes_nothing(pool: PgPool) {
    let rec = seed_recommendation(&pool, 6).await;

    let result = advance(&pool, rec.id, 3, &sessions(2)).await.unwrap();
    assert!(result.is_none());
    assert_eq!(WorkoutRepo::count_for_week(&pool, rec.id, 3).await.unwrap(), 0);

    let rec = RecommendationRepo::find_by_id(&pool, rec.id).await.unwrap().unwrap();
    assert_eq!(rec.current_week, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn failed_week_insert_rolls_back_advance(pool: PgPool) {
    let rec = seed_recommendation(&pool, 6).await;
    let mut duplicate = sessions(2);
    duplicate[1].session_number = 1;

    assert!(advance(&pool, rec.id, 2, &duplicate).await.is_err());
    assert_eq!(WorkoutRepo::count_for_week(&pool, rec.id, 2).await.unwrap(), 0);

    let rec = RecommendationRepo::find_by_id(&pool, rec.id).await.unwrap().unwrap();
    assert_eq!(rec.current_week, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn advance_past_program_end_refused(pool: PgPool) {
    let rec = seed_recommendation(&pool, 1).await;
    let result = advance(&pool, rec.id, 2, &sessions(2)).await.unwrap();
    assert!(result.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn scan_extraction_then_verification(pool: PgPool) {
    let client = ClientRepo::create(
        &pool,
        &CreateClient {
            trainer_id: 1,
            name: "Sam".to_string(),
        },
    )
    .await
    .unwrap();
    let scan = ScanRepo::create(
        &pool,
        &CreateScan {
            client_id: client.id,
            image_path: "/tmp/scans/1.png".to_string(),
            image_mime: "image/png".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(scan.extraction_status(), Some(ScanExtractionStatus::Pending));

    // Verification is refused until extraction completed.
    let values = ScanMeasurements {
        weight_kg: Some(80.0),
        ..Default::default()
    };
    assert!(ScanRepo::verify(&pool, scan.id, &values).await.unwrap().is_none());

    let extracted = ScanRepo::record_extraction(&pool, scan.id, &values)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(extracted.extraction_status(), Some(ScanExtractionStatus::Completed));
    assert!(extracted.extracted_at.is_some());

    let corrected = ScanMeasurements {
        weight_kg: Some(79.5),
        body_fat_percent: Some(21.0),
        ..Default::default()
    };
    let verified = ScanRepo::verify(&pool, scan.id, &corrected).await.unwrap().unwrap();
    assert_eq!(verified.extraction_status(), Some(ScanExtractionStatus::Verified));
    assert_eq!(verified.measurements(), corrected);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn advance_rolled_back_by_caller_leaves_week_unwritten(pool: PgPool) {
    let rec = seed_recommendation(&pool, 6).await;

    let mut tx = pool.begin().await.unwrap();
    let inserted = RecommendationRepo::advance_week(&mut tx, rec.id, 2, &sessions(3))
        .await
        .unwrap();
    assert_eq!(inserted.map(|w| w.len()), Some(3));
    tx.rollback().await.unwrap();

    assert_eq!(WorkoutRepo::count_for_week(&pool, rec.id, 2).await.unwrap(), 0);
    let rec = RecommendationRepo::find_by_id(&pool, rec.id).await.unwrap().unwrap();
    assert_eq!(rec.current_week, 1);
}
