//! Clients for the external services the job processor delegates to.
//!
//! The LLM-backed generation service produces training plans and weekly
//! workouts; the OCR service reads numbers off InBody scan sheets. Both are
//! reached over HTTP and hidden behind the [`RecommendationGenerator`],
//! [`WeekGenerator`] and [`ScanExtractor`] traits so the worker can be tested
//! with fakes.

pub mod client;
pub mod config;
pub mod error;
pub mod ocr;
pub mod types;

use async_trait::async_trait;
use fitcoach_core::measurements::ScanMeasurements;

pub use client::GenerationClient;
pub use config::GenerationConfig;
pub use error::GenerationError;
pub use ocr::OcrClient;
pub use types::{
    GeneratedRecommendation, GeneratedWorkout, PreviousWorkout, QuestionnaireInput, WeekRequest,
};

/// Produces a full plan (and its first week) from questionnaire answers.
#[async_trait]
pub trait RecommendationGenerator: Send + Sync {
    async fn generate_recommendation(
        &self,
        input: &QuestionnaireInput,
    ) -> Result<GeneratedRecommendation, GenerationError>;
}

/// Produces the workouts of one program week.
#[async_trait]
pub trait WeekGenerator: Send + Sync {
    async fn generate_week(
        &self,
        request: &WeekRequest,
    ) -> Result<Vec<GeneratedWorkout>, GenerationError>;
}

/// Reads body-composition values from a scan image.
#[async_trait]
pub trait ScanExtractor: Send + Sync {
    async fn extract(&self, image: &[u8], mime: &str) -> Result<ScanMeasurements, GenerationError>;
}
