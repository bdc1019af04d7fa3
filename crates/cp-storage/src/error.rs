use cp_core::error::AppError;

/// Maps a storage failure onto the shared error taxonomy. A unique-constraint
/// violation becomes `Conflict`; a missing row the caller already expected is
/// handled by callers via `Option`, not this path.
pub fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(db_err.message().to_string())
        }
        sqlx::Error::RowNotFound => AppError::NotFound("record not found".into()),
        other => AppError::Internal(other.to_string()),
    }
}
