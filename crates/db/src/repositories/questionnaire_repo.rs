//! Repository for the `questionnaires` table.

use fitcoach_core::types::DbId;
use sqlx::PgPool;

use crate::models::questionnaire::{CreateQuestionnaire, Questionnaire};

const COLUMNS: &str = "id, client_id, responses, created_at, updated_at";

pub struct QuestionnaireRepo;

impl QuestionnaireRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateQuestionnaire,
    ) -> Result<Questionnaire, sqlx::Error> {
        let query = format!(
            "INSERT INTO questionnaires (client_id, responses) VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Questionnaire>(&query)
            .bind(input.client_id)
            .bind(&input.responses)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Questionnaire>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM questionnaires WHERE id = $1");
        sqlx::query_as::<_, Questionnaire>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
