//! Repository for the `inbody_scans` table.

use fitcoach_core::measurements::ScanMeasurements;
use fitcoach_core::status::ScanExtractionStatus;
use fitcoach_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::scan::{CreateScan, Scan};

const COLUMNS: &str = "\
    id, client_id, image_path, image_mime, extraction_status_id, extraction_error, \
    weight_kg, skeletal_muscle_mass_kg, body_fat_mass_kg, body_fat_percent, bmi, \
    total_body_water_l, visceral_fat_level, basal_metabolic_rate_kcal, inbody_score, \
    extracted_at, verified_at, created_at, updated_at";

pub struct ScanRepo;

impl ScanRepo {
    /// Insert a scan in `pending` extraction status.
    pub async fn create(pool: &PgPool, input: &CreateScan) -> Result<Scan, sqlx::Error> {
        let query = format!(
            "INSERT INTO inbody_scans (client_id, image_path, image_mime, extraction_status_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Scan>(&query)
            .bind(input.client_id)
            .bind(&input.image_path)
            .bind(&input.image_mime)
            .bind(ScanExtractionStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Scan>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM inbody_scans WHERE id = $1");
        sqlx::query_as::<_, Scan>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Store extracted values and move the scan to `completed`.
    ///
    /// The extraction handler runs this on the transaction that completes
    /// its job.
    pub async fn record_extraction<'e, E>(
        executor: E,
        id: DbId,
        values: &ScanMeasurements,
    ) -> Result<Option<Scan>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE inbody_scans SET \
                 weight_kg = $2, skeletal_muscle_mass_kg = $3, body_fat_mass_kg = $4, \
                 body_fat_percent = $5, bmi = $6, total_body_water_l = $7, \
                 visceral_fat_level = $8, basal_metabolic_rate_kcal = $9, inbody_score = $10, \
                 extraction_status_id = $11, extraction_error = NULL, extracted_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        bind_measurements(sqlx::query_as::<_, Scan>(&query).bind(id), values)
            .bind(ScanExtractionStatus::Completed.id())
            .fetch_optional(executor)
            .await
    }

    /// Move a still-`pending` scan to `failed`, keeping the reason for the
    /// trainer. Returns whether a row changed; a scan that already finished
    /// extraction is left alone.
    pub async fn mark_extraction_failed(
        pool: &PgPool,
        id: DbId,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE inbody_scans SET extraction_status_id = $2, extraction_error = $3 \
             WHERE id = $1 AND extraction_status_id = $4",
        )
        .bind(id)
        .bind(ScanExtractionStatus::Failed.id())
        .bind(error)
        .bind(ScanExtractionStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Trainer confirms (and possibly corrects) the extracted values.
    ///
    /// Only a `completed` scan can be verified; `None` otherwise.
    pub async fn verify(
        pool: &PgPool,
        id: DbId,
        values: &ScanMeasurements,
    ) -> Result<Option<Scan>, sqlx::Error> {
        let query = format!(
            "UPDATE inbody_scans SET \
                 weight_kg = $2, skeletal_muscle_mass_kg = $3, body_fat_mass_kg = $4, \
                 body_fat_percent = $5, bmi = $6, total_body_water_l = $7, \
                 visceral_fat_level = $8, basal_metabolic_rate_kcal = $9, inbody_score = $10, \
                 extraction_status_id = $11, verified_at = NOW() \
             WHERE id = $1 AND extraction_status_id = $12 \
             RETURNING {COLUMNS}"
        );
        bind_measurements(sqlx::query_as::<_, Scan>(&query).bind(id), values)
            .bind(ScanExtractionStatus::Verified.id())
            .bind(ScanExtractionStatus::Completed.id())
            .fetch_optional(pool)
            .await
    }
}

type ScanQuery<'q> = sqlx::query::QueryAs<'q, sqlx::Postgres, Scan, sqlx::postgres::PgArguments>;

/// Bind the nine measurement columns as `$2..$10`.
fn bind_measurements<'q>(q: ScanQuery<'q>, m: &ScanMeasurements) -> ScanQuery<'q> {
    q.bind(m.weight_kg)
        .bind(m.skeletal_muscle_mass_kg)
        .bind(m.body_fat_mass_kg)
        .bind(m.body_fat_percent)
        .bind(m.bmi)
        .bind(m.total_body_water_l)
        .bind(m.visceral_fat_level)
        .bind(m.basal_metabolic_rate_kcal)
        .bind(m.inbody_score)
}
