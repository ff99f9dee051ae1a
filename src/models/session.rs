use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One login instance. Revoked by clearing `is_active`; rows are never deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserSession {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub is_active: bool,
    pub expires_at: String,
    pub created_at: String,
    pub updated_at: String,
}

pub const SESSION_COLUMNS: &str =
    "id, user_id, token_hash, is_active, expires_at, created_at, updated_at";
