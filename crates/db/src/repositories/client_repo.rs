//! Repository for the `clients` table.
//!
//! Client records are managed by the CRUD screens; the job layer only needs
//! to confirm a client exists before attaching an uploaded scan to it.

use fitcoach_core::types::DbId;
use sqlx::PgPool;

use crate::models::client::{Client, CreateClient};

const COLUMNS: &str = "id, trainer_id, name, created_at, updated_at";

pub struct ClientRepo;

impl ClientRepo {
    pub async fn create(pool: &PgPool, input: &CreateClient) -> Result<Client, sqlx::Error> {
        let query = format!(
            "INSERT INTO clients (trainer_id, name) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(input.trainer_id)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Client>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clients WHERE id = $1");
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
