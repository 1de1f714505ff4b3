use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use fitcoach_core::types::{DbId, Timestamp};

/// A row from the `clients` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Client {
    pub id: DbId,
    pub trainer_id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct CreateClient {
    pub trainer_id: DbId,
    pub name: String,
}
