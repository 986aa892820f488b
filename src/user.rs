//! User records. Users are pre-seeded; this store only reads.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub pin_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn get_by_id(conn: &mut PgConnection, user_id: &str) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, pin_hash, created_at, updated_at FROM users_tb WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    user.ok_or_else(|| AppError::not_found("user not found"))
}
