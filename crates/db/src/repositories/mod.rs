//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod client_repo;
pub mod job_repo;
pub mod questionnaire_repo;
pub mod recommendation_repo;
pub mod scan_repo;
pub mod workout_repo;

pub use client_repo::ClientRepo;
pub use job_repo::JobRepo;
pub use questionnaire_repo::QuestionnaireRepo;
pub use recommendation_repo::RecommendationRepo;
pub use scan_repo::ScanRepo;
pub use workout_repo::WorkoutRepo;
