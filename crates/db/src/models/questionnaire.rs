use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use fitcoach_core::types::{DbId, Timestamp};

/// A row from the `questionnaires` table.
///
/// `responses` is the raw answer sheet collected by the intake form.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Questionnaire {
    pub id: DbId,
    pub client_id: DbId,
    pub responses: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestionnaire {
    pub client_id: DbId,
    pub responses: serde_json::Value,
}
