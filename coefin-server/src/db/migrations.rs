//! Startup DDL migrations.
//!
//! Idempotent CREATE IF NOT EXISTS statements run once before the server
//! starts listening. Constraints enforce the data-model invariants:
//! (brn, country) unique, non-empty names, score bounded 0..=100, and
//! cascade deletion along ownership edges.

use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id              BIGSERIAL PRIMARY KEY,
        nickname        VARCHAR(30) NOT NULL UNIQUE,
        email           VARCHAR(256) NOT NULL UNIQUE,
        password_hash   TEXT NOT NULL,
        is_active       BOOLEAN NOT NULL DEFAULT TRUE,
        is_superuser    BOOLEAN NOT NULL DEFAULT FALSE,
        is_verified     BOOLEAN NOT NULL DEFAULT FALSE,
        CONSTRAINT nickname_min_len CHECK (char_length(nickname) >= 6)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS companies (
        id          BIGSERIAL PRIMARY KEY,
        name        VARCHAR(300) NOT NULL,
        brn         VARCHAR(100) NOT NULL,
        country     VARCHAR(2) NOT NULL,
        score       NUMERIC(8, 5),
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT brn_country_unique UNIQUE (brn, country),
        CONSTRAINT name_min_len CHECK (char_length(name) >= 1),
        CONSTRAINT brn_min_len CHECK (char_length(brn) >= 1),
        CONSTRAINT score_range CHECK (score IS NULL OR score BETWEEN 0 AND 100)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS analytics (
        id          BIGSERIAL PRIMARY KEY,
        name        VARCHAR(30) NOT NULL,
        company_id  BIGINT NOT NULL
            REFERENCES companies (id) ON UPDATE RESTRICT ON DELETE CASCADE,
        CONSTRAINT analytics_name_min_len CHECK (char_length(name) >= 1)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ratios (
        id            BIGSERIAL PRIMARY KEY,
        name          VARCHAR(20) NOT NULL,
        value         NUMERIC NOT NULL,
        deviation     TEXT CHECK (deviation IN ('Lower', 'Upper')),
        analytics_id  BIGINT NOT NULL
            REFERENCES analytics (id) ON UPDATE RESTRICT ON DELETE CASCADE,
        CONSTRAINT ratio_name_min_len CHECK (char_length(name) >= 1)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS companies_users (
        company_id  BIGINT NOT NULL
            REFERENCES companies (id) ON UPDATE RESTRICT ON DELETE CASCADE,
        user_id     BIGINT NOT NULL
            REFERENCES users (id) ON UPDATE RESTRICT ON DELETE CASCADE,
        PRIMARY KEY (company_id, user_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS analytics_company_idx ON analytics (company_id)",
    "CREATE INDEX IF NOT EXISTS ratios_analytics_idx ON ratios (analytics_id)",
    "CREATE INDEX IF NOT EXISTS companies_created_at_idx ON companies (created_at, id)",
];

/// Apply the schema to the connected database.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!("database schema is up to date");
    Ok(())
}
