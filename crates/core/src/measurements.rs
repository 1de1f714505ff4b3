//! Body-composition measurements read from InBody scan sheets.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Numeric fields extracted from (or confirmed on) an InBody scan.
///
/// Every field is optional because OCR may miss any of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanMeasurements {
    pub weight_kg: Option<f64>,
    pub skeletal_muscle_mass_kg: Option<f64>,
    pub body_fat_mass_kg: Option<f64>,
    pub body_fat_percent: Option<f64>,
    pub bmi: Option<f64>,
    pub total_body_water_l: Option<f64>,
    pub visceral_fat_level: Option<f64>,
    pub basal_metabolic_rate_kcal: Option<f64>,
    pub inbody_score: Option<f64>,
}

impl ScanMeasurements {
    fn fields(&self) -> [(&'static str, Option<f64>); 9] {
        [
            ("weight_kg", self.weight_kg),
            ("skeletal_muscle_mass_kg", self.skeletal_muscle_mass_kg),
            ("body_fat_mass_kg", self.body_fat_mass_kg),
            ("body_fat_percent", self.body_fat_percent),
            ("bmi", self.bmi),
            ("total_body_water_l", self.total_body_water_l),
            ("visceral_fat_level", self.visceral_fat_level),
            ("basal_metabolic_rate_kcal", self.basal_metabolic_rate_kcal),
            ("inbody_score", self.inbody_score),
        ]
    }

    /// Number of fields that carry a value.
    pub fn populated_count(&self) -> usize {
        self.fields().iter().filter(|(_, v)| v.is_some()).count()
    }

    /// An extraction that found nothing is treated as a failed extraction.
    pub fn is_usable(&self) -> bool {
        self.populated_count() > 0
    }

    /// Reject negative or non-finite values and percentages above 100.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, value) in self.fields() {
            let Some(value) = value else { continue };
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::Validation(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }
        if self.body_fat_percent.is_some_and(|pct| pct > 100.0) {
            return Err(CoreError::Validation(
                "body_fat_percent must not exceed 100".to_string(),
            ));
        }
        Ok(())
    }
}
