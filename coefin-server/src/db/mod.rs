//! Database layer: pool handle, retry wrapper, migrations and repositories.
//!
//! Every query goes through [`retry::with_retry`], which retries
//! connection-class failures and re-types everything else, so repositories
//! only ever see [`DbError`].

pub mod migrations;
pub mod pool;
pub mod repos;
pub mod retry;

use coefin_core::settings::DbSettings;
use sqlx::PgPool;
use thiserror::Error;

/// SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Typed database failure. The distinction matters for HTTP mapping:
/// both classes answer with an empty 500, but connection failures are
/// logged as critical while response failures are ordinary errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// The database could not be reached (timeout, disconnection).
    #[error("database is unavailable ({})", code.as_deref().unwrap_or("no code"))]
    Connection { code: Option<String> },

    /// The database rejected or failed to execute the request.
    #[error("database failed to execute the request ({})", code.as_deref().unwrap_or("no code"))]
    Response { code: Option<String> },
}

impl DbError {
    /// True when the failure is a unique-constraint violation, which some
    /// write paths deliberately absorb as a soft conflict.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Response { code: Some(code) } if code == UNIQUE_VIOLATION)
    }
}

/// Pool handle plus the retry budget applied to every operation.
#[derive(Debug, Clone)]
pub struct Db {
    pool: PgPool,
    retries: u32,
}

impl Db {
    pub fn new(pool: PgPool, settings: &DbSettings) -> Self {
        Self {
            pool,
            retries: settings.retries,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}
