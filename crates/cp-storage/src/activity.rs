use cp_core::error::AppError;
use cp_core::ids::UserId;
use sqlx::PgPool;

use crate::error::map_sqlx_error;
use crate::models::ActivityEventRow;

#[derive(Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, row: &ActivityEventRow) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO activity_events (user_id, occurred_at, action, status, target, details) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&row.user_id)
        .bind(row.occurred_at)
        .bind(&row.action)
        .bind(&row.status)
        .bind(&row.target)
        .bind(&row.details)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Most-recent-first read, per the bus's `history` contract.
    pub async fn history(&self, user_id: &UserId, limit: i64) -> Result<Vec<ActivityEventRow>, AppError> {
        sqlx::query_as::<_, ActivityEventRow>(
            "SELECT user_id, occurred_at, action, status, target, details \
             FROM activity_events WHERE user_id = $1 ORDER BY occurred_at DESC LIMIT $2",
        )
        .bind(user_id.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }
}
