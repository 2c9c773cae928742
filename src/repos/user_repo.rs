/*
 * Responsibility
 * - user document store の interface (UserStore trait)
 * - backend (postgres / in-memory) に依存しない document / filter の型
 * - 業務ロジックは置かない
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::repos::error::RepoResult;
use crate::services::auth::role::Role;

/// Stored user record, including its credential hash and the latest token pair.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserDocument {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub user_type: Role,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    All,
    Email(String),
    Phone(String),
    UserId(String),
}

impl UserFilter {
    pub fn matches(&self, doc: &UserDocument) -> bool {
        match self {
            UserFilter::All => true,
            UserFilter::Email(email) => doc.email == *email,
            UserFilter::Phone(phone) => doc.phone == *phone,
            UserFilter::UserId(id) => doc.user_id == *id,
        }
    }
}

/// `$set` payload for the token linkage of a user.
#[derive(Debug, Clone)]
pub struct TokenUpdate {
    pub token: String,
    pub refresh_token: String,
    pub updated_at: DateTime<Utc>,
}

/// Document store consumed by the auth flows.
///
/// Implementations must make `upsert_tokens` atomic per `user_id`
/// (last writer wins).
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    // Backend name (for logging)
    fn backend_name(&self) -> &'static str;

    async fn count_matching(&self, filter: &UserFilter) -> RepoResult<u64>;

    // Returns the stored user_id.
    async fn insert_one(&self, doc: UserDocument) -> RepoResult<String>;

    async fn find_one(&self, filter: &UserFilter) -> RepoResult<Option<UserDocument>>;

    // Creates the linkage if absent, never deletes.
    async fn upsert_tokens(&self, user_id: &str, update: &TokenUpdate) -> RepoResult<()>;

    async fn find_page(&self, skip: u64, limit: u64) -> RepoResult<Vec<UserDocument>>;
}
