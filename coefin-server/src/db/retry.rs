//! Retry-on-transient-failure wrapper for database operations.
//!
//! Connection-class failures (dropped sockets, pool timeouts) are retried up
//! to the configured number of attempts; the last failure is re-raised as
//! [`DbError::Connection`]. Any other sqlx error is translated to
//! [`DbError::Response`] carrying the SQLSTATE when the driver exposes one.
//! Errors are never swallowed, only retried or re-typed.

use std::future::Future;

use super::DbError;

/// Whether the error indicates the database could not be reached at all,
/// as opposed to the database rejecting the request.
fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

/// Translate a sqlx error into the typed taxonomy.
pub fn translate(err: sqlx::Error) -> DbError {
    if is_connection_error(&err) {
        return DbError::Connection { code: None };
    }

    match err {
        sqlx::Error::Database(db_err) => DbError::Response {
            code: db_err.code().map(|code| code.into_owned()),
        },
        _ => DbError::Response { code: None },
    }
}

/// Run `op`, retrying connection-class failures up to `retries` attempts
/// (including the first). The caller's await suspends across attempts; the
/// operation is observable at most once by the caller on success.
pub async fn with_retry<T, F, Fut>(retries: u32, mut op: F) -> Result<T, DbError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let attempts = retries.max(1);
    let mut last = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_connection_error(&err) => {
                tracing::warn!(attempt, attempts, error = %err, "transient database failure");
                last = Some(err);
            }
            Err(err) => return Err(translate(err)),
        }
    }

    Err(translate(last.expect("at least one attempt was made")))
}
