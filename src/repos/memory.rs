/*
 * Responsibility
 * - process 内で完結する UserStore 実装 (DATABASE_URL 未設定の development / tests 用)
 * - postgres 実装と同じく users と token linkage を分けて持つ
 */
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::repos::error::{RepoError, RepoResult};
use crate::repos::user_repo::{TokenUpdate, UserDocument, UserFilter, UserStore};

#[derive(Debug, Default)]
struct Inner {
    // insertion order == created_at order
    users: Vec<UserDocument>,
    tokens: HashMap<String, TokenUpdate>,
}

impl Inner {
    fn merged(&self, doc: &UserDocument) -> UserDocument {
        let mut out = doc.clone();
        if let Some(linkage) = self.tokens.get(&doc.user_id) {
            out.token = Some(linkage.token.clone());
            out.refresh_token = Some(linkage.refresh_token.clone());
            out.updated_at = linkage.updated_at;
        }
        out
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Inner>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn count_matching(&self, filter: &UserFilter) -> RepoResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().filter(|u| filter.matches(u)).count() as u64)
    }

    async fn insert_one(&self, mut doc: UserDocument) -> RepoResult<String> {
        let mut inner = self.inner.write().await;

        // Same uniqueness as the postgres schema
        let taken = inner.users.iter().any(|u| {
            u.user_id == doc.user_id || u.email == doc.email || u.phone == doc.phone
        });
        if taken {
            return Err(RepoError::Conflict);
        }

        if let (Some(token), Some(refresh_token)) = (doc.token.take(), doc.refresh_token.take()) {
            inner.tokens.insert(
                doc.user_id.clone(),
                TokenUpdate {
                    token,
                    refresh_token,
                    updated_at: doc.updated_at,
                },
            );
        }

        let user_id = doc.user_id.clone();
        inner.users.push(doc);
        Ok(user_id)
    }

    async fn find_one(&self, filter: &UserFilter) -> RepoResult<Option<UserDocument>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| filter.matches(u))
            .map(|u| inner.merged(u)))
    }

    async fn upsert_tokens(&self, user_id: &str, update: &TokenUpdate) -> RepoResult<()> {
        let mut inner = self.inner.write().await;
        inner.tokens.insert(user_id.to_string(), update.clone());
        Ok(())
    }

    async fn find_page(&self, skip: u64, limit: u64) -> RepoResult<Vec<UserDocument>> {
        let inner = self.inner.read().await;
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(inner
            .users
            .iter()
            .skip(skip)
            .take(limit)
            .map(|u| inner.merged(u))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::services::auth::role::Role;

    fn doc(user_id: &str, email: &str, phone: &str) -> UserDocument {
        let now = Utc::now();
        UserDocument {
            user_id: user_id.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            password_hash: "hash".to_string(),
            user_type: Role::User,
            token: Some("t0".to_string()),
            refresh_token: Some("r0".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_each_filter() {
        let store = InMemoryUserStore::new();
        store.insert_one(doc("u1", "a@example.com", "111")).await.unwrap();

        for filter in [
            UserFilter::UserId("u1".into()),
            UserFilter::Email("a@example.com".into()),
            UserFilter::Phone("111".into()),
        ] {
            let found = store.find_one(&filter).await.unwrap().unwrap();
            assert_eq!(found.user_id, "u1");
            assert_eq!(found.token.as_deref(), Some("t0"));
        }
        assert!(
            store
                .find_one(&UserFilter::Email("nobody@example.com".into()))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn duplicate_email_or_phone_conflicts() {
        let store = InMemoryUserStore::new();
        store.insert_one(doc("u1", "a@example.com", "111")).await.unwrap();

        let dup_email = store.insert_one(doc("u2", "a@example.com", "222")).await;
        let dup_phone = store.insert_one(doc("u3", "b@example.com", "111")).await;

        assert!(matches!(dup_email, Err(RepoError::Conflict)));
        assert!(matches!(dup_phone, Err(RepoError::Conflict)));
        assert_eq!(store.count_matching(&UserFilter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_overwrites_pair_and_updated_at() {
        let store = InMemoryUserStore::new();
        store.insert_one(doc("u1", "a@example.com", "111")).await.unwrap();

        let later = Utc::now() + Duration::seconds(5);
        store
            .upsert_tokens(
                "u1",
                &TokenUpdate {
                    token: "t1".into(),
                    refresh_token: "r1".into(),
                    updated_at: later,
                },
            )
            .await
            .unwrap();

        let found = store
            .find_one(&UserFilter::UserId("u1".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.token.as_deref(), Some("t1"));
        assert_eq!(found.refresh_token.as_deref(), Some("r1"));
        assert_eq!(found.updated_at, later);
    }

    #[tokio::test]
    async fn upsert_without_user_creates_linkage_only() {
        let store = InMemoryUserStore::new();
        store
            .upsert_tokens(
                "ghost",
                &TokenUpdate {
                    token: "t".into(),
                    refresh_token: "r".into(),
                    updated_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        assert_eq!(store.count_matching(&UserFilter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_page_respects_skip_and_limit() {
        let store = InMemoryUserStore::new();
        for i in 0..5 {
            store
                .insert_one(doc(&format!("u{i}"), &format!("{i}@example.com"), &format!("{i}")))
                .await
                .unwrap();
        }

        let page = store.find_page(1, 2).await.unwrap();
        let ids: Vec<_> = page.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);

        assert!(store.find_page(10, 2).await.unwrap().is_empty());
    }
}
