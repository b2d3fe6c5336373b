//! Database connection pool management.

use coefin_core::settings::{DbCredentials, DbSettings};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Create the PostgreSQL connection pool from settings.
///
/// The hard connection cap is the configured pool size plus overflow; the
/// acquire timeout bounds how long a request waits for a free connection.
pub async fn create_pool(
    credentials: &DbCredentials,
    settings: &DbSettings,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections())
        .acquire_timeout(settings.timeout)
        .connect(&credentials.dsn())
        .await
}
