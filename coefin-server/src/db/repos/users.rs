//! User repository.
//!
//! Duplicate nicknames and emails are absorbed at the database level
//! (ON CONFLICT / unique-violation translation) and surface as `None`;
//! the auth layer decides which user-facing error that becomes.

use sqlx::FromRow;

use crate::db::{retry::with_retry, Db, DbError};
use crate::models::UserRead;

/// Persisted user, including the password hash. Never serialized; the
/// API-facing shape is [`UserRead`].
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub nickname: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_verified: bool,
}

impl UserRow {
    pub fn to_read(&self) -> UserRead {
        UserRead {
            nickname: self.nickname.clone(),
            email: self.email.clone(),
            is_active: self.is_active,
            is_superuser: self.is_superuser,
            is_verified: self.is_verified,
        }
    }
}

const USER_COLUMNS: &str =
    "id, nickname, email, password_hash, is_active, is_superuser, is_verified";

/// User repository.
pub struct UserRepo<'a> {
    db: &'a Db,
}

impl<'a> UserRepo<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Insert a user. `None` when the nickname or email is already taken.
    pub async fn create(
        &self,
        nickname: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<UserRow>, DbError> {
        let sql = format!(
            "INSERT INTO users (nickname, email, password_hash) \
             VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING \
             RETURNING {USER_COLUMNS}"
        );

        with_retry(self.db.retries(), || async {
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(nickname)
                .bind(email)
                .bind(password_hash)
                .fetch_optional(self.db.pool())
                .await
        })
        .await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, DbError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        with_retry(self.db.retries(), || async {
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(email)
                .fetch_optional(self.db.pool())
                .await
        })
        .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<UserRow>, DbError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        with_retry(self.db.retries(), || async {
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(id)
                .fetch_optional(self.db.pool())
                .await
        })
        .await
    }

    pub async fn mark_verified(&self, id: i64) -> Result<(), DbError> {
        with_retry(self.db.retries(), || async {
            sqlx::query("UPDATE users SET is_verified = TRUE WHERE id = $1")
                .bind(id)
                .execute(self.db.pool())
                .await
        })
        .await?;
        Ok(())
    }

    pub async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<(), DbError> {
        with_retry(self.db.retries(), || async {
            sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(self.db.pool())
                .await
        })
        .await?;
        Ok(())
    }

    /// Update nickname and/or email. `None` when the new value collides
    /// with another user.
    pub async fn update_profile(
        &self,
        id: i64,
        nickname: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<UserRow>, DbError> {
        let sql = format!(
            "UPDATE users \
             SET nickname = COALESCE($2, nickname), email = COALESCE($3, email) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );

        let result = with_retry(self.db.retries(), || async {
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(id)
                .bind(nickname)
                .bind(email)
                .fetch_optional(self.db.pool())
                .await
        })
        .await;

        match result {
            Err(err) if err.is_unique_violation() => Ok(None),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coefin_core::settings::DbSettings;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_registration_returns_none() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = sqlx::PgPool::connect(&url).await.expect("connect failed");
        crate::db::migrations::run(&pool).await.expect("migrations failed");

        let db = Db::new(pool, &DbSettings::default());
        let repo = UserRepo::new(&db);

        let first = repo
            .create("ivan-ivanov", "ivanov@mail.ru", "hash")
            .await
            .expect("create failed");
        assert!(first.is_some());

        let second = repo
            .create("ivan-ivanov", "other@mail.ru", "hash")
            .await
            .expect("create failed");
        assert!(second.is_none());
    }
}
