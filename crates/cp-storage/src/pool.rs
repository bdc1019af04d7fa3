use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to Postgres with a bounded pool. Migrations are run by the binary
/// crate at startup via `sqlx::migrate!`, not here, so this stays usable from
/// tests that manage their own schema.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}
