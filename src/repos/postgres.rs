/*
 * Responsibility
 * - users / user_tokens テーブル向け SQLx 実装 (UserStore)
 * - token pair は user_tokens に分離し、user_id 単位で upsert する
 * - DB エラーは RepoError に変換して返す
 */
use async_trait::async_trait;
use sqlx::PgPool;

use crate::repos::error::{RepoError, RepoResult};
use crate::repos::user_repo::{TokenUpdate, UserDocument, UserFilter, UserStore};

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    first_name    TEXT NOT NULL,
    last_name     TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    phone         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    user_type     TEXT NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL
)
"#;

const CREATE_USER_TOKENS: &str = r#"
CREATE TABLE IF NOT EXISTS user_tokens (
    user_id       TEXT PRIMARY KEY,
    token         TEXT NOT NULL,
    refresh_token TEXT NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL
)
"#;

const SELECT_USER: &str = r#"
SELECT
    u.user_id, u.first_name, u.last_name, u.email, u.phone,
    u.password_hash, u.user_type,
    t.token, t.refresh_token,
    u.created_at,
    COALESCE(t.updated_at, u.updated_at) AS updated_at
FROM users u
LEFT JOIN user_tokens t ON t.user_id = u.user_id
"#;

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> RepoResult<()> {
        sqlx::query(CREATE_USERS).execute(&self.pool).await?;
        sqlx::query(CREATE_USER_TOKENS).execute(&self.pool).await?;
        Ok(())
    }
}

// Column + bind value for a filter. Column names are static, never user input.
fn predicate(filter: &UserFilter) -> Option<(&'static str, &str)> {
    match filter {
        UserFilter::All => None,
        UserFilter::Email(v) => Some(("u.email", v.as_str())),
        UserFilter::Phone(v) => Some(("u.phone", v.as_str())),
        UserFilter::UserId(v) => Some(("u.user_id", v.as_str())),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn count_matching(&self, filter: &UserFilter) -> RepoResult<u64> {
        let n: i64 = match predicate(filter) {
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users u")
                    .fetch_one(&self.pool)
                    .await?
            }
            Some((column, value)) => {
                let sql = format!("SELECT COUNT(*) FROM users u WHERE {column} = $1");
                sqlx::query_scalar(&sql)
                    .bind(value)
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(n.max(0) as u64)
    }

    async fn insert_one(&self, doc: UserDocument) -> RepoResult<String> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                user_id, first_name, last_name, email, phone,
                password_hash, user_type, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&doc.user_id)
        .bind(&doc.first_name)
        .bind(&doc.last_name)
        .bind(&doc.email)
        .bind(&doc.phone)
        .bind(&doc.password_hash)
        .bind(doc.user_type.as_str())
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(RepoError::from_sqlx)?;

        if let (Some(token), Some(refresh_token)) = (&doc.token, &doc.refresh_token) {
            sqlx::query(
                r#"
                INSERT INTO user_tokens (user_id, token, refresh_token, updated_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&doc.user_id)
            .bind(token)
            .bind(refresh_token)
            .bind(doc.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(RepoError::from_sqlx)?;
        }

        tx.commit().await?;

        Ok(doc.user_id)
    }

    async fn find_one(&self, filter: &UserFilter) -> RepoResult<Option<UserDocument>> {
        let row = match predicate(filter) {
            None => {
                let sql = format!("{SELECT_USER} ORDER BY u.created_at LIMIT 1");
                sqlx::query_as::<_, UserDocument>(&sql)
                    .fetch_optional(&self.pool)
                    .await?
            }
            Some((column, value)) => {
                let sql = format!("{SELECT_USER} WHERE {column} = $1 LIMIT 1");
                sqlx::query_as::<_, UserDocument>(&sql)
                    .bind(value)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        Ok(row)
    }

    async fn upsert_tokens(&self, user_id: &str, update: &TokenUpdate) -> RepoResult<()> {
        // Single statement: concurrent logins race, the last write wins.
        sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, token, refresh_token, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET token = EXCLUDED.token,
                refresh_token = EXCLUDED.refresh_token,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .bind(&update.token)
        .bind(&update.refresh_token)
        .bind(update.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_page(&self, skip: u64, limit: u64) -> RepoResult<Vec<UserDocument>> {
        let sql = format!("{SELECT_USER} ORDER BY u.created_at, u.user_id LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, UserDocument>(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(skip).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
