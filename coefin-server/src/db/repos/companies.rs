//! Company repository.
//!
//! Read operations return fully-loaded [`CompanyRead`] graphs: companies are
//! fetched first, then analytics, ratios and associated users are batched
//! with `= ANY($1)` queries and stitched together in memory (no N+1, no
//! lazy fields at the API boundary).
//!
//! Ordered listings always append `id` as a secondary sort key so pages are
//! deterministic when the sort column has duplicate values.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::db::{retry::with_retry, Db, DbError};
use crate::models::{
    AnalyticsRead, CompanyCreate, CompanyRead, CompanySearch, CursorPage, CursorToken,
    Deviation, OffsetPage, OffsetParams, OrderBy, RatioRead, UserRead, ValidationError,
};

#[derive(Debug, Clone, FromRow)]
struct CompanyRow {
    id: i64,
    name: String,
    brn: String,
    country: String,
    score: Option<Decimal>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct AnalyticsRow {
    id: i64,
    name: String,
    company_id: i64,
}

#[derive(Debug, FromRow)]
struct RatioRow {
    name: String,
    value: Decimal,
    deviation: Option<String>,
    analytics_id: i64,
}

#[derive(Debug, FromRow)]
struct CompanyUserRow {
    nickname: String,
    email: String,
    is_active: bool,
    is_superuser: bool,
    is_verified: bool,
    company_id: i64,
}

/// Typed keyset position for the `read_all` listing, ordered by
/// (created_at, id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyCursor {
    Start,
    After { created_at: DateTime<Utc>, id: i64 },
    Before { created_at: DateTime<Utc>, id: i64 },
}

impl CompanyCursor {
    fn key(created_at: &DateTime<Utc>) -> String {
        created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_key(key: &str) -> Result<DateTime<Utc>, ValidationError> {
        DateTime::parse_from_rfc3339(key)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ValidationError::InvalidFormat {
                field: "nextPage",
                reason: "must be a cursor token returned by a previous page",
            })
    }

    pub fn to_token(&self) -> CursorToken {
        match self {
            Self::Start => CursorToken::Start,
            Self::After { created_at, id } => CursorToken::After {
                key: Self::key(created_at),
                id: *id,
            },
            Self::Before { created_at, id } => CursorToken::Before {
                key: Self::key(created_at),
                id: *id,
            },
        }
    }
}

impl TryFrom<CursorToken> for CompanyCursor {
    type Error = ValidationError;

    fn try_from(token: CursorToken) -> Result<Self, Self::Error> {
        Ok(match token {
            CursorToken::Start => Self::Start,
            CursorToken::After { key, id } => Self::After {
                created_at: Self::parse_key(&key)?,
                id,
            },
            CursorToken::Before { key, id } => Self::Before {
                created_at: Self::parse_key(&key)?,
                id,
            },
        })
    }
}

const COMPANY_COLUMNS: &str = "id, name, brn, country, score, created_at";

/// Company repository.
pub struct CompanyRepo<'a> {
    db: &'a Db,
}

impl<'a> CompanyRepo<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Unique lookup by natural key (BRN + country), fully loaded.
    pub async fn read_one(&self, search: &CompanySearch) -> Result<Option<CompanyRead>, DbError> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE brn = $1 AND country = $2");

        let row = with_retry(self.db.retries(), || async {
            sqlx::query_as::<_, CompanyRow>(&sql)
                .bind(search.brn.as_str())
                .bind(search.country.as_str())
                .fetch_optional(self.db.pool())
                .await
        })
        .await?;

        match row {
            None => Ok(None),
            Some(row) => Ok(self.load_graphs(vec![row]).await?.pop()),
        }
    }

    /// Insert a new company. A duplicate (brn, country) pair is a soft
    /// conflict absorbed by the database: the result is `None`, not an
    /// error, regardless of how the concurrent writes interleave.
    pub async fn write_one(&self, create: &CompanyCreate) -> Result<Option<CompanyRead>, DbError> {
        let created_id = with_retry(self.db.retries(), || async {
            let mut tx = self.db.pool().begin().await?;

            let id = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO companies (name, brn, country)
                VALUES ($1, $2, $3)
                ON CONFLICT (brn, country) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(create.name.as_str())
            .bind(create.brn.as_str())
            .bind(create.country.as_str())
            .fetch_optional(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(id)
        })
        .await?;

        match created_id {
            None => Ok(None),
            Some(id) => Ok(Some(self.read_by_id(id).await?)),
        }
    }

    /// Offset-paginated companies associated with a user, ordered by score.
    pub async fn read_by_user(
        &self,
        nickname: &str,
        params: &OffsetParams,
    ) -> Result<OffsetPage<CompanyRead>, DbError> {
        let filter = r#"
            EXISTS (
                SELECT 1
                FROM companies_users cu
                JOIN users u ON u.id = cu.user_id
                WHERE cu.company_id = c.id AND u.nickname = $1
            )
        "#;

        let count_sql = format!("SELECT COUNT(*) FROM companies c WHERE {filter}");
        let total = with_retry(self.db.retries(), || async {
            sqlx::query_scalar::<_, i64>(&count_sql)
                .bind(nickname)
                .fetch_one(self.db.pool())
                .await
        })
        .await?;

        let dir = params.order_by.as_sql();
        let page_sql = format!(
            "SELECT c.id, c.name, c.brn, c.country, c.score, c.created_at \
             FROM companies c WHERE {filter} \
             ORDER BY c.score {dir}, c.id {dir} LIMIT $2 OFFSET $3"
        );

        let rows = with_retry(self.db.retries(), || async {
            sqlx::query_as::<_, CompanyRow>(&page_sql)
                .bind(nickname)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(self.db.pool())
                .await
        })
        .await?;

        let (page, size) = params.normalized();
        let items = self.load_graphs(rows).await?;
        Ok(OffsetPage::new(items, total, page, size))
    }

    /// Cursor-paginated listing of all companies ordered by creation time.
    pub async fn read_all(
        &self,
        cursor: CompanyCursor,
        size: u32,
        order: OrderBy,
    ) -> Result<CursorPage<CompanyRead>, DbError> {
        let total = with_retry(self.db.retries(), || async {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM companies")
                .fetch_one(self.db.pool())
                .await
        })
        .await?;

        // Forward comparison follows the sort direction; a Before token
        // scans in the reversed direction and the rows are flipped back.
        let (dir, dir_rev, cmp_fwd, cmp_back) = match order {
            OrderBy::Asc => ("ASC", "DESC", ">", "<"),
            OrderBy::Desc => ("DESC", "ASC", "<", ">"),
        };
        let probe_limit = i64::from(size) + 1;

        let mut rows = match &cursor {
            CompanyCursor::Start => {
                let sql = format!(
                    "SELECT {COMPANY_COLUMNS} FROM companies \
                     ORDER BY created_at {dir}, id {dir} LIMIT $1"
                );
                with_retry(self.db.retries(), || async {
                    sqlx::query_as::<_, CompanyRow>(&sql)
                        .bind(probe_limit)
                        .fetch_all(self.db.pool())
                        .await
                })
                .await?
            }
            CompanyCursor::After { created_at, id } => {
                let sql = format!(
                    "SELECT {COMPANY_COLUMNS} FROM companies \
                     WHERE (created_at, id) {cmp_fwd} ($1, $2) \
                     ORDER BY created_at {dir}, id {dir} LIMIT $3"
                );
                with_retry(self.db.retries(), || async {
                    sqlx::query_as::<_, CompanyRow>(&sql)
                        .bind(*created_at)
                        .bind(*id)
                        .bind(probe_limit)
                        .fetch_all(self.db.pool())
                        .await
                })
                .await?
            }
            CompanyCursor::Before { created_at, id } => {
                let sql = format!(
                    "SELECT {COMPANY_COLUMNS} FROM companies \
                     WHERE (created_at, id) {cmp_back} ($1, $2) \
                     ORDER BY created_at {dir_rev}, id {dir_rev} LIMIT $3"
                );
                with_retry(self.db.retries(), || async {
                    sqlx::query_as::<_, CompanyRow>(&sql)
                        .bind(*created_at)
                        .bind(*id)
                        .bind(probe_limit)
                        .fetch_all(self.db.pool())
                        .await
                })
                .await?
            }
        };

        let has_extra = rows.len() > size as usize;
        rows.truncate(size as usize);
        if matches!(cursor, CompanyCursor::Before { .. }) {
            rows.reverse();
        }

        let first = rows.first().map(|r| (r.created_at, r.id));
        let last = rows.last().map(|r| (r.created_at, r.id));

        let previous_page = match (&cursor, first) {
            (CompanyCursor::Start, _) => None,
            (CompanyCursor::Before { .. }, Some((created_at, id))) if has_extra => {
                Some(CompanyCursor::Before { created_at, id }.to_token().encode())
            }
            (CompanyCursor::Before { .. }, _) => None,
            (CompanyCursor::After { .. }, Some((created_at, id))) => {
                Some(CompanyCursor::Before { created_at, id }.to_token().encode())
            }
            (CompanyCursor::After { .. }, None) => None,
        };

        let next_page = match (&cursor, last) {
            (CompanyCursor::Before { .. }, Some((created_at, id))) => {
                Some(CompanyCursor::After { created_at, id }.to_token().encode())
            }
            (_, Some((created_at, id))) if has_extra => {
                Some(CompanyCursor::After { created_at, id }.to_token().encode())
            }
            _ => None,
        };

        let items = self.load_graphs(rows).await?;

        Ok(CursorPage {
            items,
            total,
            current_page: Some(cursor.to_token().encode()),
            previous_page,
            next_page,
        })
    }

    async fn read_by_id(&self, id: i64) -> Result<CompanyRead, DbError> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1");

        let row = with_retry(self.db.retries(), || async {
            sqlx::query_as::<_, CompanyRow>(&sql)
                .bind(id)
                .fetch_one(self.db.pool())
                .await
        })
        .await?;

        Ok(self
            .load_graphs(vec![row])
            .await?
            .pop()
            .expect("a fetched row always maps to a read"))
    }

    /// Re-query the relationship graph for a batch of companies and return
    /// fully populated reads. This is the eager-loading step: values are
    /// snapshotted here and nothing lazy escapes to the API boundary.
    async fn load_graphs(&self, rows: Vec<CompanyRow>) -> Result<Vec<CompanyRead>, DbError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let company_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

        let analytics_rows = with_retry(self.db.retries(), || async {
            sqlx::query_as::<_, AnalyticsRow>(
                "SELECT id, name, company_id FROM analytics \
                 WHERE company_id = ANY($1) ORDER BY id",
            )
            .bind(&company_ids)
            .fetch_all(self.db.pool())
            .await
        })
        .await?;

        let analytics_ids: Vec<i64> = analytics_rows.iter().map(|r| r.id).collect();
        let ratio_rows = if analytics_ids.is_empty() {
            Vec::new()
        } else {
            with_retry(self.db.retries(), || async {
                sqlx::query_as::<_, RatioRow>(
                    "SELECT name, value, deviation, analytics_id FROM ratios \
                     WHERE analytics_id = ANY($1) ORDER BY id",
                )
                .bind(&analytics_ids)
                .fetch_all(self.db.pool())
                .await
            })
            .await?
        };

        let user_rows = with_retry(self.db.retries(), || async {
            sqlx::query_as::<_, CompanyUserRow>(
                "SELECT u.nickname, u.email, u.is_active, u.is_superuser, u.is_verified, \
                        cu.company_id \
                 FROM users u \
                 JOIN companies_users cu ON cu.user_id = u.id \
                 WHERE cu.company_id = ANY($1) ORDER BY u.nickname",
            )
            .bind(&company_ids)
            .fetch_all(self.db.pool())
            .await
        })
        .await?;

        let mut ratios_by_analytics: HashMap<i64, Vec<RatioRead>> = HashMap::new();
        for ratio in ratio_rows {
            ratios_by_analytics
                .entry(ratio.analytics_id)
                .or_default()
                .push(RatioRead {
                    name: ratio.name,
                    value: ratio.value,
                    deviation: ratio.deviation.as_deref().and_then(Deviation::parse),
                });
        }

        let mut analytics_by_company: HashMap<i64, Vec<AnalyticsRead>> = HashMap::new();
        for analytics in analytics_rows {
            let ratios = ratios_by_analytics.remove(&analytics.id).unwrap_or_default();
            analytics_by_company
                .entry(analytics.company_id)
                .or_default()
                .push(AnalyticsRead {
                    name: analytics.name,
                    ratios,
                });
        }

        let mut users_by_company: HashMap<i64, Vec<UserRead>> = HashMap::new();
        for user in user_rows {
            users_by_company.entry(user.company_id).or_default().push(UserRead {
                nickname: user.nickname,
                email: user.email,
                is_active: user.is_active,
                is_superuser: user.is_superuser,
                is_verified: user.is_verified,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| CompanyRead {
                analytics: analytics_by_company.remove(&row.id).unwrap_or_default(),
                users: users_by_company.remove(&row.id).unwrap_or_default(),
                name: row.name,
                brn: row.brn,
                country: row.country,
                score: row.score,
                created_at: row.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Brn, CompanyName, CountryCode};
    use coefin_core::settings::DbSettings;

    fn db(pool: sqlx::PgPool) -> Db {
        Db::new(pool, &DbSettings::default())
    }

    async fn test_pool() -> sqlx::PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = sqlx::PgPool::connect(&url).await.expect("connect failed");
        crate::db::migrations::run(&pool).await.expect("migrations failed");
        pool
    }

    #[test]
    fn cursor_token_conversion_round_trips() {
        let cursor = CompanyCursor::After {
            created_at: "2024-05-01T12:00:00.000001Z".parse().unwrap(),
            id: 7,
        };
        let token = cursor.to_token();
        assert_eq!(CompanyCursor::try_from(token).unwrap(), cursor);
    }

    #[test]
    fn cursor_rejects_garbled_key() {
        let token = CursorToken::After {
            key: "yesterday".into(),
            id: 7,
        };
        let err = CompanyCursor::try_from(token).unwrap_err();
        assert_eq!(err.field(), "nextPage");
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn write_then_read_round_trips_and_duplicate_is_none() {
        let db = db(test_pool().await);
        let repo = CompanyRepo::new(&db);

        let create = CompanyCreate {
            name: CompanyName::new("Acme Holdings").unwrap(),
            brn: Brn::new("1234567890").unwrap(),
            country: CountryCode::new("US").unwrap(),
        };

        let written = repo.write_one(&create).await.expect("write failed");
        assert!(written.is_some());

        let search = CompanySearch {
            brn: Brn::new("1234567890").unwrap(),
            country: CountryCode::new("US").unwrap(),
        };
        let read = repo.read_one(&search).await.expect("read failed").expect("not found");
        assert_eq!(read.brn, "1234567890");
        assert_eq!(read.country, "US");

        // Duplicate natural key is a soft conflict, not an error.
        let duplicate = repo.write_one(&create).await.expect("write failed");
        assert!(duplicate.is_none());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn read_by_user_scopes_to_linked_companies_with_stable_ties() {
        let db = db(test_pool().await);
        let repo = CompanyRepo::new(&db);

        let user_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (nickname, email, password_hash) \
             VALUES ($1, $2, 'hash') RETURNING id",
        )
        .bind("lev-nikolaevich")
        .bind("tolstoy@mail.ru")
        .fetch_one(db.pool())
        .await
        .expect("user insert failed");

        // Two linked companies with identical scores, one unlinked decoy.
        for brn in ["7701111111", "7702222222"] {
            let company_id = sqlx::query_scalar::<_, i64>(
                "INSERT INTO companies (name, brn, country, score) \
                 VALUES ($1, $2, 'RU', 50) RETURNING id",
            )
            .bind(format!("Company {brn}"))
            .bind(brn)
            .fetch_one(db.pool())
            .await
            .expect("company insert failed");

            sqlx::query("INSERT INTO companies_users (company_id, user_id) VALUES ($1, $2)")
                .bind(company_id)
                .bind(user_id)
                .execute(db.pool())
                .await
                .expect("link insert failed");
        }
        sqlx::query(
            "INSERT INTO companies (name, brn, country, score) \
             VALUES ('Unlinked', '7703333333', 'RU', 99)",
        )
        .execute(db.pool())
        .await
        .expect("company insert failed");

        let params = OffsetParams {
            page: Some(1),
            size: Some(50),
            order_by: OrderBy::Asc,
        };
        let page = repo
            .read_by_user("lev-nikolaevich", &params)
            .await
            .expect("read failed");

        assert_eq!(page.total, 2);
        let brns: Vec<&str> = page.items.iter().map(|c| c.brn.as_str()).collect();
        // Equal scores fall back to id order, so the page is deterministic.
        assert_eq!(brns, vec!["7701111111", "7702222222"]);
        assert!(page
            .items
            .iter()
            .all(|c| c.users.iter().any(|u| u.nickname == "lev-nikolaevich")));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn first_cursor_page_has_stable_current_and_no_previous() {
        let db = db(test_pool().await);
        let repo = CompanyRepo::new(&db);

        let first = repo
            .read_all(CompanyCursor::Start, 10, OrderBy::Asc)
            .await
            .expect("read failed");
        let again = repo
            .read_all(CompanyCursor::Start, 10, OrderBy::Asc)
            .await
            .expect("read failed");

        assert!(first.previous_page.is_none());
        assert_eq!(first.current_page, again.current_page);
        assert_eq!(
            first.items.iter().map(|c| &c.brn).collect::<Vec<_>>(),
            again.items.iter().map(|c| &c.brn).collect::<Vec<_>>(),
        );
    }
}
