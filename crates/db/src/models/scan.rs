//! InBody body-composition scans.

use serde::Serialize;
use sqlx::FromRow;
use fitcoach_core::measurements::ScanMeasurements;
use fitcoach_core::status::{ScanExtractionStatus, StatusId};
use fitcoach_core::types::{DbId, Timestamp};

/// A row from the `inbody_scans` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Scan {
    pub id: DbId,
    pub client_id: DbId,
    #[serde(skip_serializing)]
    pub image_path: String,
    pub image_mime: String,
    pub extraction_status_id: StatusId,
    pub extraction_error: Option<String>,
    pub weight_kg: Option<f64>,
    pub skeletal_muscle_mass_kg: Option<f64>,
    pub body_fat_mass_kg: Option<f64>,
    pub body_fat_percent: Option<f64>,
    pub bmi: Option<f64>,
    pub total_body_water_l: Option<f64>,
    pub visceral_fat_level: Option<f64>,
    pub basal_metabolic_rate_kcal: Option<f64>,
    pub inbody_score: Option<f64>,
    pub extracted_at: Option<Timestamp>,
    pub verified_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Scan {
    pub fn extraction_status(&self) -> Option<ScanExtractionStatus> {
        ScanExtractionStatus::from_id(self.extraction_status_id)
    }

    pub fn measurements(&self) -> ScanMeasurements {
        ScanMeasurements {
            weight_kg: self.weight_kg,
            skeletal_muscle_mass_kg: self.skeletal_muscle_mass_kg,
            body_fat_mass_kg: self.body_fat_mass_kg,
            body_fat_percent: self.body_fat_percent,
            bmi: self.bmi,
            total_body_water_l: self.total_body_water_l,
            visceral_fat_level: self.visceral_fat_level,
            basal_metabolic_rate_kcal: self.basal_metabolic_rate_kcal,
            inbody_score: self.inbody_score,
        }
    }
}

/// Insert DTO for a freshly uploaded scan image.
#[derive(Debug, Clone)]
pub struct CreateScan {
    pub client_id: DbId,
    pub image_path: String,
    pub image_mime: String,
}
